//! Resumable, bidirectional enumeration of the shard tree.
//!
//! The total order is: scheme (V1 before V2), then each directory level in
//! name order (for V2 the size level comes first), then the data file name.
//! A page is resumed from the last identifier of the previous page; the walk
//! descends straight to that position and continues strictly after (or
//! before) it. No state is kept between calls.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::codec;
use crate::fs_util::{dir_exists, list_dir, DirEntryInfo};
use crate::layout::{identity_from_data_path, is_data_leaf, scheme_root, ShardPath};
use crate::scheme::Scheme;
use crate::{CasError, Result};

/// Traversal direction over the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Scheme visiting order.
    fn schemes(self) -> [Scheme; 2] {
        match self {
            Direction::Forward => [Scheme::V1, Scheme::V2],
            Direction::Backward => [Scheme::V2, Scheme::V1],
        }
    }

    /// Compare two names in traversal order.
    fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Direction::Forward => a.cmp(b),
            Direction::Backward => b.cmp(a),
        }
    }
}

/// One step of the resume chain derived from a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Descend into the directory with this name.
    Enter(String),
    /// The cursor's own data file: pass it without emitting it.
    Guard(String),
}

impl Step {
    fn name(&self) -> &str {
        match self {
            Step::Enter(name) | Step::Guard(name) => name,
        }
    }
}

fn resume_chain(shard: &ShardPath) -> VecDeque<Step> {
    shard
        .data_dir()
        .iter()
        .cloned()
        .map(Step::Enter)
        .chain(std::iter::once(Step::Guard(
            shard.data_file_name().to_string(),
        )))
        .collect()
}

/// List up to `limit` identifiers strictly after (`Forward`) or before
/// (`Backward`) `cursor`.
///
/// An empty cursor starts at the beginning of the order when going forward and
/// at its end when going backward. Any other cursor must be a decodable
/// identifier, typically the last one returned by the previous call.
#[instrument(skip(root), fields(root = %root.display()), level = "debug")]
pub fn list(root: &Path, cursor: &str, direction: Direction, limit: usize) -> Result<Vec<String>> {
    if !dir_exists(root)? {
        return Err(CasError::NotFound(root.display().to_string()));
    }

    let mut out = Vec::new();
    if limit == 0 {
        return Ok(out);
    }

    let (start, mut resume) = if cursor.trim().is_empty() {
        (None, None)
    } else {
        let identity = codec::decode(cursor)?;
        let shard = ShardPath::derive(&identity, identity.scheme());
        (Some(identity.scheme()), Some(resume_chain(&shard)))
    };

    let schemes = direction.schemes();
    let first = start
        .and_then(|s| schemes.iter().position(|&x| x == s))
        .unwrap_or(0);

    for scheme in &schemes[first..] {
        // Only the cursor's own scheme is restricted; later schemes start fresh.
        let walker = Walker::new(root, *scheme, direction);
        walker.run(resume.take(), limit, &mut out)?;
        if out.len() >= limit {
            break;
        }
    }

    debug!(count = out.len(), "listed identifiers");
    Ok(out)
}

/// An open directory on the explicit traversal stack.
struct Frame {
    dir: PathBuf,
    entries: std::vec::IntoIter<DirEntryInfo>,
    /// Resume step pending at this level, if the cursor position has not been passed yet.
    pending: Option<Step>,
    /// Steps for the levels below `pending`.
    rest: VecDeque<Step>,
}

enum Visit {
    Skip,
    Descend(Option<VecDeque<Step>>),
    Leaf,
}

impl Frame {
    fn open(dir: PathBuf, direction: Direction, resume: Option<VecDeque<Step>>) -> io::Result<Self> {
        let mut entries = list_dir(&dir)?;
        if direction == Direction::Backward {
            entries.reverse();
        }
        let (pending, rest) = match resume {
            Some(mut chain) => (chain.pop_front(), chain),
            None => (None, VecDeque::new()),
        };
        Ok(Self {
            dir,
            entries: entries.into_iter(),
            pending,
            rest,
        })
    }

    fn visit(&mut self, entry: &DirEntryInfo, direction: Direction, scheme: Scheme) -> Visit {
        if let Some(step) = &self.pending {
            match direction.compare(&entry.name, step.name()) {
                Ordering::Less => return Visit::Skip,
                Ordering::Equal => {
                    let rest = std::mem::take(&mut self.rest);
                    return match self.pending.take() {
                        Some(Step::Enter(_)) if entry.is_dir => Visit::Descend(Some(rest)),
                        // The cursor leaf itself, or a file shadowing a resume directory.
                        _ => Visit::Skip,
                    };
                }
                Ordering::Greater => {
                    // The cursor position no longer exists; everything from here on is after it.
                    self.pending = None;
                    self.rest.clear();
                }
            }
        }

        if entry.is_dir {
            Visit::Descend(None)
        } else if is_data_leaf(scheme, &entry.name) {
            Visit::Leaf
        } else {
            Visit::Skip
        }
    }
}

/// Depth-first walk of one scheme sub-tree.
struct Walker {
    scheme_root: PathBuf,
    scheme: Scheme,
    direction: Direction,
}

impl Walker {
    fn new(root: &Path, scheme: Scheme, direction: Direction) -> Self {
        Self {
            scheme_root: scheme_root(root, scheme),
            scheme,
            direction,
        }
    }

    fn run(
        &self,
        resume: Option<VecDeque<Step>>,
        limit: usize,
        out: &mut Vec<String>,
    ) -> Result<()> {
        if !dir_exists(&self.scheme_root)? {
            return Ok(());
        }

        let mut stack = vec![Frame::open(
            self.scheme_root.clone(),
            self.direction,
            resume,
        )?];

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.entries.next() else {
                stack.pop();
                continue;
            };

            match frame.visit(&entry, self.direction, self.scheme) {
                Visit::Skip => {}
                Visit::Descend(resume) => {
                    let dir = frame.dir.join(&entry.name);
                    match Frame::open(dir, self.direction, resume) {
                        Ok(child) => stack.push(child),
                        // Removed between listing and descending.
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Visit::Leaf => {
                    let path = frame.dir.join(&entry.name);
                    match identity_from_data_path(&self.scheme_root, &path, self.scheme) {
                        Ok(identity) => {
                            out.push(codec::encode(&identity));
                            if out.len() >= limit {
                                return Ok(());
                            }
                        }
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "skipping malformed shard directory");
                            stack.pop();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
