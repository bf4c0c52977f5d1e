fn main() {
    println!("cargo:rerun-if-env-changed=FRIDGEWATCH_CONFIG");

    // Host builds (tests, fuzzing) have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
