mod password_reset_test;
