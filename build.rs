fn main() {
    // ESP-IDF link arguments are only meaningful for the firmware build.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
