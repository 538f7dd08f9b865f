fn main() {
    // ESP-IDF sysenv passthrough is only meaningful for flash builds;
    // host-target test builds carry no espidf feature.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
