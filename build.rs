use vergen::EmitBuilder;

fn main() {
    // Stamp the build with the current git sha, consumed by `driver::version()`.
    // Ignore failures outside a git checkout (e.g. a source tarball build).
    let _ = EmitBuilder::builder().git_sha(true).fail_on_error().emit();
}
