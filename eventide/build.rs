fn main() {
    // Prevent warnings when checking for flag `eventide_loom`.
    println!("cargo::rustc-check-cfg=cfg(eventide_loom)");
}
