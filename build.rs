//! Build script for compiling the control-plane Protocol Buffer definitions.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/mcpv.proto");

    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            // SAFETY: build scripts are single-threaded at this point.
            unsafe {
                std::env::set_var("PROTOC", protoc);
            }
        }
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/mcpv.proto"], &["proto"])?;

    Ok(())
}
