fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/user.proto");

    let fds = protox::compile(["proto/user.proto"], ["proto/"])?;

    // The gateway only consumes the user service.
    tonic_prost_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_fds(fds)?;

    Ok(())
}
