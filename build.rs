use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=.env");

    // Bake the optional `.env` credentials file into the firmware image.
    // If it is absent, an empty file is written and the defaults apply.
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let contents = std::fs::read_to_string(".env").unwrap_or_default();
    std::fs::write(out_dir.join("device.env"), &contents).expect("write baked device.env");

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        if contents.is_empty() {
            println!("cargo:warning=no .env found; firmware will boot without WiFi credentials");
        }
        embuild::espidf::sysenv::output();
    }
}
