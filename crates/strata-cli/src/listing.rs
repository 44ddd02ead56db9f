//! `ls`: paginated enumeration over the store.

use anyhow::Result;
use clap::Args;
use strata_cas::{BlobStore, Direction};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Resume after this identifier (exclusive)
    #[arg(long, value_name = "ID", default_value = "")]
    pub after: String,

    /// Walk the order backwards
    #[arg(long)]
    pub reverse: bool,

    /// Page size (defaults to `list.page_size` from config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Keep fetching pages until the store is exhausted
    #[arg(long)]
    pub all: bool,

    /// Emit a JSON array instead of one identifier per line
    #[arg(long)]
    pub json: bool,
}

pub fn run(store: &BlobStore, args: ListArgs, default_limit: usize) -> Result<()> {
    let ids = collect(store, &args, default_limit)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        for id in &ids {
            println!("{}", id);
        }
    }
    Ok(())
}

fn collect(store: &BlobStore, args: &ListArgs, default_limit: usize) -> Result<Vec<String>> {
    let direction = if args.reverse {
        Direction::Backward
    } else {
        Direction::Forward
    };
    let limit = args.limit.unwrap_or(default_limit);

    let mut ids = store.list(&args.after, direction, limit)?;
    if !args.all || limit == 0 {
        return Ok(ids);
    }

    let mut page_len = ids.len();
    while page_len == limit {
        let Some(cursor) = ids.last().cloned() else {
            break;
        };
        let page = store.list(&cursor, direction, limit)?;
        page_len = page.len();
        ids.extend(page);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_cas::Scheme;
    use tempfile::TempDir;

    fn args(limit: usize, reverse: bool, all: bool) -> ListArgs {
        ListArgs {
            after: String::new(),
            reverse,
            limit: Some(limit),
            all,
            json: false,
        }
    }

    fn store_with(contents: &[(&str, Scheme)]) -> (TempDir, BlobStore) {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path().join("root"), temp.path().join("tmp")).unwrap();
        for (body, scheme) in contents {
            store.put(*scheme, "f.txt", body.as_bytes()).unwrap();
        }
        (temp, store)
    }

    #[test]
    fn test_single_page() {
        let (_temp, store) = store_with(&[("a", Scheme::V1), ("bb", Scheme::V2), ("ccc", Scheme::V2)]);
        let ids = collect(&store, &args(2, false, false), 100).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_all_pages_match_one_big_page() {
        let (_temp, store) = store_with(&[
            ("a", Scheme::V1),
            ("bb", Scheme::V1),
            ("ccc", Scheme::V2),
            ("dddd", Scheme::V2),
            ("eeeee", Scheme::V2),
        ]);
        let everything = store.list("", Direction::Forward, 100).unwrap();
        assert_eq!(everything.len(), 5);

        for limit in 1..=5 {
            assert_eq!(collect(&store, &args(limit, false, true), 100).unwrap(), everything);
        }

        let mut reversed = everything.clone();
        reversed.reverse();
        assert_eq!(collect(&store, &args(2, true, true), 100).unwrap(), reversed);
    }

    #[test]
    fn test_default_limit_applies() {
        let (_temp, store) = store_with(&[("a", Scheme::V2), ("bb", Scheme::V2)]);
        let mut list_args = args(0, false, false);
        list_args.limit = None;
        assert_eq!(collect(&store, &list_args, 1).unwrap().len(), 1);
    }
}
