// Build provenance for `cmdserver version --extended`.
const EXPORTS: [(&str, &str); 2] = [
    ("TARGET", "CMDSERVER_BUILD_TARGET"),
    ("PROFILE", "CMDSERVER_BUILD_PROFILE"),
];

fn main() {
    for (var, exported) in EXPORTS {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
