use tracing::debug;
use walkdir::WalkDir;

use super::PasteSource;
use crate::resource::{FolderResource, Resource, ResourceResult, ResourceStore};

fn folder_size(store: &dyn ResourceStore, folder: &FolderResource) -> ResourceResult<u64> {
    let mut total: u64 = 0;
    for member in store.members(folder)? {
        total = total.saturating_add(match member {
            Resource::File(file) => store.content_length(&file)?,
            Resource::Folder(sub) => folder_size(store, &sub)?,
        });
    }
    Ok(total)
}

/// Best-effort byte total of everything `sources` would copy. Entries that
/// cannot be measured count as zero.
pub fn estimate_total_size(store: &dyn ResourceStore, sources: &[PasteSource]) -> u64 {
    let mut total: u64 = 0;
    for source in sources {
        let size = match source {
            PasteSource::External(path) => WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| entry.metadata().ok())
                .map(|meta| meta.len())
                .sum::<u64>(),
            PasteSource::Resource(path) => {
                let measured = match store.resolve(path) {
                    Ok(Some(Resource::File(file))) => store.content_length(&file),
                    Ok(Some(Resource::Folder(folder))) => folder_size(store, &folder),
                    Ok(None) => Ok(0),
                    Err(e) => Err(e),
                };
                measured.unwrap_or_else(|e| {
                    debug!(%path, error = %e, "size estimate failed");
                    0
                })
            }
        };
        total = total.saturating_add(size);
    }
    total
}
