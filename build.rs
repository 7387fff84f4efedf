fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (no `espidf` feature) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
