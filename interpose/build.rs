/// Build script for the shim
///
/// Compiles `tests/fixtures/fake_pmpi.c` into a shared library that the
/// exported-symbol tests load in place of a real MPI. The shim itself needs
/// nothing from here, so a missing C compiler only produces a warning.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const FIXTURE: &str = "tests/fixtures/fake_pmpi.c";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", FIXTURE);

    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    let library = out_dir.join("libfake_pmpi.so");

    let compiler = cc::Build::new()
        .pic(true)
        .cargo_metadata(false)
        .warnings(false)
        .try_get_compiler();
    let mut command: Command = match compiler {
        Ok(compiler) => compiler.to_command(),
        Err(e) => {
            println!("cargo:warning=no C compiler for the fake PMPI library: {}", e);
            return;
        }
    };

    match command.arg("-shared").arg("-o").arg(&library).arg(FIXTURE).status() {
        Ok(status) if status.success() => {
            println!("cargo:rustc-env=RAPI_FAKE_PMPI={}", library.display());
        }
        Ok(status) => println!("cargo:warning=building the fake PMPI library failed: {}", status),
        Err(e) => println!("cargo:warning=building the fake PMPI library failed: {}", e),
    }
}
