// Copyright 2025-2026 CEMAXECUTER LLC

fn main() {
    // libsdrplay_api installs under /usr/local/lib on most distros.
    println!("cargo:rustc-link-search=native=/usr/local/lib");
    println!("cargo:rustc-link-lib=sdrplay_api");
}
