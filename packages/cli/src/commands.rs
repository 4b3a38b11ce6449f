//! Command implementations.

use std::io::{self, Read, Write};

use kvfs_core::{DirectoryFilter, OpenOptions, Path, PathMatcher};
use kvfs_provider::{parse_uri, BackendFactory, Registry};

use crate::{CliError, Command};

/// Resolve `uri` to a path, creating the filesystem for its endpoint on
/// first use.
fn resolve<F: BackendFactory>(registry: &Registry<F>, uri: &str) -> Result<Path, CliError> {
    let parsed = parse_uri(uri, registry.factory().default_port())?;
    if registry.filesystem(&parsed.endpoint).is_err() {
        let base = format!("{}://{}", parsed.scheme, parsed.endpoint);
        registry.resolve_or_create(&base)?;
    }
    Ok(registry.path_from_uri(uri)?)
}

pub fn execute<F: BackendFactory>(
    registry: &Registry<F>,
    command: &Command,
    input: &mut dyn Read,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Ls { uri, glob, regex } => {
            let dir = resolve(registry, uri)?;
            let matcher = match (glob, regex) {
                (Some(glob), _) => Some(PathMatcher::parse(&format!("glob:{}", glob))?),
                (None, Some(regex)) => Some(PathMatcher::parse(&format!("regex:{}", regex))?),
                (None, None) => None,
            };
            let filter = matcher.as_ref().map(|m| m as &dyn DirectoryFilter);
            for entry in registry.list_directory(&dir, filter)? {
                writeln!(out, "{}", entry.to_absolute_string())?;
            }
        }
        Command::Cat { uri } => {
            let path = resolve(registry, uri)?;
            let mut channel = registry.open_channel(&path, &OpenOptions::new())?;
            io::copy(&mut channel, out)?;
        }
        Command::Put { uri, append, .. } => {
            let path = resolve(registry, uri)?;
            let options = if *append {
                OpenOptions::new().append(true).create(true)
            } else {
                OpenOptions::new().write(true).create(true).truncate(true)
            };
            let mut channel = registry.open_channel(&path, &options)?;
            let written = io::copy(input, &mut channel)?;
            log::info!("Wrote {} bytes to {}", written, path.to_absolute_string());
        }
        Command::Rm { uri } => {
            let path = resolve(registry, uri)?;
            registry.delete(&path)?;
        }
        Command::Mv { src, dst } => {
            let (src, dst) = (resolve(registry, src)?, resolve(registry, dst)?);
            registry.move_path(&src, &dst)?;
        }
        Command::Cp { src, dst } => {
            let (src, dst) = (resolve(registry, src)?, resolve(registry, dst)?);
            if !registry.copy(&src, &dst)? {
                return Err(kvfs_core::Error::NoSuchKey {
                    key: src.content_key(),
                }
                .into());
            }
        }
        Command::Stat { uri } => {
            let path = resolve(registry, uri)?;
            let attrs = registry.read_attributes(&path)?;
            writeln!(out, "key: {}", attrs.file_key)?;
            writeln!(out, "exists: {}", attrs.exists)?;
            writeln!(out, "size: {}", attrs.size)?;
            writeln!(out, "last_modified_ms: {}", attrs.last_modified_ms)?;
            writeln!(out, "last_accessed_ms: {}", attrs.last_accessed_ms)?;
            writeln!(out, "created_ms: {}", attrs.created_ms)?;
        }
        Command::Df { uri } => {
            let path = resolve(registry, uri)?;
            let capacity = registry.capacity(&path)?;
            writeln!(out, "used: {}", capacity.used)?;
            writeln!(out, "total: {}", capacity.total)?;
            writeln!(out, "usable: {}", capacity.usable())?;
        }
    }
    Ok(())
}
