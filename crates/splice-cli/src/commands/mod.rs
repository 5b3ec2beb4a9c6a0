//! CLI command implementations.

mod resolve;

pub use resolve::{ResolveArgs, resolve, validate};

use splice_resolver::TemplateCatalog;

pub fn templates() {
    let catalog = TemplateCatalog::builtin();
    for name in catalog.names() {
        println!("{}", name);
    }
}
