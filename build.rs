use anyhow::Result;
use vergen::EmitBuilder;

fn main() -> Result<()> {
    // git information is optional, e.g. when building from a
    // source tarball
    let _ = EmitBuilder::builder()
        .git_branch()
        .git_sha(true)
        .fail_on_error()
        .quiet()
        .emit();
    Ok(())
}
