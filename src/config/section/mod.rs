//! Configuration section definitions.
//!
//! | Module       | TOML Section    | Purpose                              |
//! |--------------|-----------------|--------------------------------------|
//! | `repository` | `[repository]`  | Root directory of the site data      |
//! | `site`       | `[[site]]`      | One entry per site                   |

mod repository;
mod site;

pub use repository::RepositoryConfig;
pub use site::{HostnameEntry, SiteEntry};
