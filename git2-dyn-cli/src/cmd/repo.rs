//! Repository commands: branches, status, config and discover.

use std::path::{Path, PathBuf};

use git2_dyn::{BranchType, ConfigEntry, ConfigLevel, Error, GitConfig, Repository, Result, Status};
use serde_json::json;
use tracing::debug;

use crate::output::Report;

pub fn branches(repo: &Path, kind: BranchType) -> Result<Report> {
    let repo = Repository::open(repo)?;
    let branches = repo.branches(kind)?;
    debug!(count = branches.len(), ?kind, "branches");
    let json = branches
        .iter()
        .map(|b| json!({ "name": b.name, "kind": kind_name(b.kind) }))
        .collect::<Vec<_>>();
    Ok(Report::new(json!(json)).lines(branches.iter().map(|b| match b.kind {
        BranchType::Remote => format!("  remotes/{}", b.name),
        _ => format!("  {}", b.name),
    })))
}

const fn kind_name(kind: BranchType) -> &'static str {
    match kind {
        BranchType::Local => "local",
        BranchType::Remote => "remote",
        BranchType::All => "all",
    }
}

pub fn status(repo: &Path) -> Result<Report> {
    let repo = Repository::open(repo)?;
    let entries = repo.statuses()?;
    let json = entries
        .iter()
        .map(|e| json!({ "path": e.path, "code": short_code(e.status), "bits": e.status.bits() }))
        .collect::<Vec<_>>();
    let report = Report::new(json!(json));
    if entries.is_empty() {
        return Ok(report.line("nothing to report, working tree clean"));
    }
    Ok(report.lines(entries.iter().map(|e| format!("{} {}", short_code(e.status), e.path))))
}

/// Two-column code: index state, then working-tree state.
pub fn short_code(status: Status) -> String {
    let index = [
        (Status::INDEX_NEW, 'A'),
        (Status::INDEX_MODIFIED, 'M'),
        (Status::INDEX_DELETED, 'D'),
        (Status::INDEX_RENAMED, 'R'),
        (Status::INDEX_TYPECHANGE, 'T'),
    ];
    let worktree = [
        (Status::WT_NEW, '?'),
        (Status::WT_MODIFIED, 'M'),
        (Status::WT_DELETED, 'D'),
        (Status::WT_TYPECHANGE, 'T'),
        (Status::IGNORED, '!'),
    ];
    let pick = |table: &[(Status, char)]| {
        table
            .iter()
            .find(|(bit, _)| status.contains(*bit))
            .map_or(' ', |(_, c)| *c)
    };
    if status.contains(Status::WT_NEW) && pick(&index) == ' ' {
        return "??".to_owned();
    }
    [pick(&index), pick(&worktree)].iter().collect()
}

pub fn config(repo: Option<&Path>, global: bool) -> Result<Report> {
    let (source, cfg) = if global {
        let Some(path) = GitConfig::find_global()? else {
            return Ok(Report::new(json!([])).line("no global configuration file"));
        };
        let cfg = GitConfig::new()?;
        cfg.add_file_ondisk(&path, ConfigLevel::Global, false)?;
        (path, cfg)
    } else {
        let repo = repo.ok_or_else(|| Error::InvalidArgument("a repository path or --global is required".into()))?;
        let path = Repository::open(repo)?.path()?.join("config");
        let cfg = GitConfig::new()?;
        cfg.add_file_ondisk(&path, ConfigLevel::Local, false)?;
        (path, cfg)
    };
    debug!(file = %source.display(), "reading configuration");
    let entries = cfg.entries()?;
    Ok(Report::new(json!(entries.iter().map(entry_json).collect::<Vec<_>>()))
        .lines(entries.iter().map(|e| format!("{}={}", e.name, e.value))))
}

fn entry_json(entry: &ConfigEntry) -> serde_json::Value {
    json!({
        "name": entry.name,
        "value": entry.value,
        "level": entry.level.map(|l| format!("{l:?}").to_lowercase()),
    })
}

pub fn discover(start: &Path, across_fs: bool, ceilings: &[PathBuf]) -> Result<Report> {
    let ceilings: Vec<&Path> = ceilings.iter().map(PathBuf::as_path).collect();
    match Repository::discover(start, across_fs, &ceilings)? {
        Some(found) => {
            let shown = found.display().to_string();
            Ok(Report::new(json!({ "path": shown })).line(shown))
        }
        None => Ok(Report::new(json!({ "path": null }))
            .line(format!("no repository found from {}", start.display()))
            .failed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_codes() {
        assert_eq!(short_code(Status::WT_NEW), "??");
        assert_eq!(short_code(Status::INDEX_MODIFIED | Status::WT_MODIFIED), "MM");
        assert_eq!(short_code(Status::INDEX_NEW), "A ");
        assert_eq!(short_code(Status::WT_DELETED), " D");
        assert_eq!(short_code(Status::CURRENT), "  ");
    }
}
