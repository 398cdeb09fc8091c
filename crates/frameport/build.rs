//! Bakes build facts into the `frameport version --extended` report.

fn main() {
    for (source, exported) in [
        ("TARGET", "FRAMEPORT_BUILD_TARGET"),
        ("PROFILE", "FRAMEPORT_BUILD_PROFILE"),
        ("GIT_HASH", "FRAMEPORT_GIT_HASH"),
    ] {
        if let Ok(value) = std::env::var(source) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={source}");
    }
}
