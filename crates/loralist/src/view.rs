use crate::{Entry, EntryId, EntryList};

/// One visible row in the rendered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    pub id: EntryId,
    pub depth: usize,
}

/// A folder's children: the flat sequence filtered by `parent_id`, relative
/// order preserved. Derived on demand; there is no second nested structure to
/// fall out of sync with document order.
pub fn children_of<'a>(
    list: &'a EntryList,
    folder_id: &'a EntryId,
) -> impl Iterator<Item = &'a Entry> {
    list.entries
        .iter()
        .filter(move |e| e.parent_id() == Some(folder_id))
}

/// Flattens the list into visible rows: top-level items in document order,
/// each expanded folder followed by its children at depth 1. Children of a
/// collapsed folder are hidden entirely.
pub fn layout(list: &EntryList) -> Vec<LayoutRow> {
    let mut rows = Vec::new();
    for entry in &list.entries {
        match entry {
            Entry::Folder(folder) => {
                rows.push(LayoutRow {
                    id: folder.id.clone(),
                    depth: 0,
                });
                if !folder.is_collapsed {
                    for child in children_of(list, &folder.id) {
                        rows.push(LayoutRow {
                            id: child.id().clone(),
                            depth: 1,
                        });
                    }
                }
            }
            Entry::Lora(lora) => {
                let nested = lora
                    .parent_id
                    .as_ref()
                    .is_some_and(|pid| list.get(pid).is_some_and(Entry::is_folder));
                if !nested {
                    rows.push(LayoutRow {
                        id: lora.id.clone(),
                        depth: 0,
                    });
                }
            }
        }
    }
    rows
}

/// Weights display with two decimal places everywhere.
pub fn format_weight(weight: f64) -> String {
    format!("{weight:.2}")
}
