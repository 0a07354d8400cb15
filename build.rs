// Generates server-side bindings for the non-standard screenshooter
// protocol. Everything else (core wayland, xdg-shell) comes from
// published crates, so this is the only protocol we scan ourselves.
//
// Austin Shafer - 2019
extern crate wayland_scanner;

use std::env;
use std::path::Path;
use wayland_scanner::{generate_code, Side};

fn main() {
    let out_dir_str = env::var("OUT_DIR").unwrap();
    let out_dir = Path::new(&out_dir_str);

    generate_code(
        "protocols/screenshooter.xml",
        out_dir.join("screenshooter_generated.rs"),
        Side::Server,
    );

    println!("cargo:rerun-if-changed=protocols/screenshooter.xml");
}
