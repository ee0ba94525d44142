fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/tfplugin5.proto");
    println!("cargo:rerun-if-changed=proto/tfplugin6.proto");

    // The crate's own messages are committed source. Generated ones only
    // back the wire conformance tests.
    #[cfg(feature = "wire-conformance")]
    {
        let mut config = prost_build::Config::new();
        config.disable_comments(["."]);

        tonic_build::configure()
            .build_server(false)
            .build_client(false)
            .compile_protos_with_config(
                config,
                &["proto/tfplugin5.proto", "proto/tfplugin6.proto"],
                &["proto/"],
            )?;
    }
    Ok(())
}
