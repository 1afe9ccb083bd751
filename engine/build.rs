use std::{env, fs::File, io::Write, path::Path};

fn main() {
    // write build time info
    built::write_built_file().expect("Failed to acquire build-time information");
    // unconditionally rerun this build script so build time info is always up to date
    #[cfg(not(debug_assertions))]
    println!("cargo:rerun-if-changed=foobaz");

    // Compile time constants of the sampling engine can be overridden through env vars.
    // If the env var is set, the value is written to OUT_DIR and a cfg flag is enabled.
    // The module using the constant either defines it with its default value or includes the file created here.
    let out_dir = env::var("OUT_DIR").unwrap();

    for (var, cfg) in [
        ("PTDR_INDEX_RESOLUTION", "override_ptdr_index_resolution"),
        ("PTDR_DRAWS_PER_SEGMENT", "override_ptdr_draws_per_segment"),
    ] {
        if let Ok(val) = env::var(var) {
            let dest_path = Path::new(&out_dir).join(var);
            let mut f = File::create(&dest_path).unwrap();
            f.write_all(val.as_bytes()).unwrap();
            println!("cargo:rustc-cfg={}", cfg);
        }
        println!("cargo:rustc-check-cfg=cfg({})", cfg);
        println!("cargo:rerun-if-env-changed={}", var);
    }
}
