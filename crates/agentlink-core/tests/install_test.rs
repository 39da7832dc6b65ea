//! Install, status and uninstall over throwaway home and repo directories

#![cfg(unix)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use agentlink_agents::AgentKind;
use agentlink_core::backup::list_backups;
use agentlink_core::ops::{self, InstallOptions};
use agentlink_core::symlink::{
    reconcile, remove_symlink, ConfirmationRequest, LinkAction, LinkResult,
};
use agentlink_core::{Layout, LinkStatus, Session};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Fixture {
    _home: TempDir,
    _repo: TempDir,
    layout: Layout,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let layout = Layout::new(home.path(), repo.path());
        Self {
            _home: home,
            _repo: repo,
            layout,
        }
    }

    fn home(&self, rel: &str) -> PathBuf {
        self.layout.home.join(rel)
    }

    fn config(&self, rel: &str) -> PathBuf {
        self.layout.config_dir().join(rel)
    }

    fn session(&self) -> Session {
        Session::load(self.layout.clone()).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn options(agents: &[AgentKind]) -> InstallOptions {
    InstallOptions {
        agents: agents.to_vec(),
        ..InstallOptions::default()
    }
}

fn never(request: &ConfirmationRequest) -> bool {
    panic!("unexpected prompt: {}", request.prompt())
}

fn resolves_to(target: &Path, source: &Path) -> bool {
    target.is_symlink() && fs::canonicalize(target).unwrap() == fs::canonicalize(source).unwrap()
}

fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

#[test]
fn test_install_status_uninstall_shared_rules() {
    let fx = Fixture::new();
    let source = fx.config("AGENTS.md");
    write(&source, "# Shared Agent Rules");

    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[]), None, &mut never).unwrap();
    assert!(!report.has_errors());

    let target = fx.home("AGENTS.md");
    assert!(resolves_to(&target, &source));
    assert_eq!(fs::read_to_string(&target).unwrap(), "# Shared Agent Rules");
    assert!(resolves_to(&fx.home(".claude/CLAUDE.md"), &source));

    let status = ops::status(&fx.session(), &[]).unwrap();
    let shared = status
        .links
        .iter()
        .find(|l| l.agent == AgentKind::Shared)
        .unwrap();
    assert_eq!(shared.status, LinkStatus::Correct);
    assert_eq!(status.problems().count(), 0);

    let mut session = fx.session();
    let opts = InstallOptions {
        force: true,
        ..InstallOptions::default()
    };
    let report = ops::uninstall(&mut session, &opts, None, &mut never).unwrap();
    assert!(!report.has_errors());
    assert!(target.symlink_metadata().is_err());
    assert_eq!(fs::read_to_string(&source).unwrap(), "# Shared Agent Rules");
}

#[test]
fn test_second_install_is_already_correct() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");

    let mut session = fx.session();
    let first = ops::install(&mut session, &options(&[AgentKind::Shared]), None, &mut never).unwrap();
    let second = ops::install(&mut session, &options(&[AgentKind::Shared]), None, &mut never).unwrap();
    assert_eq!(first.links[0].outcome.action, LinkAction::Created);
    assert_eq!(second.links[0].outcome.action, LinkAction::AlreadyCorrect);
}

#[test]
fn test_dry_run_touches_nothing() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");
    write(&fx.config("codex/config.toml"), "model = \"o3\"\n");
    write(
        &fx.home(".agentlink-config.yaml"),
        "settings_overrides:\n  codex:\n    model: o4-mini\n",
    );

    let mut session = fx.session();
    let opts = InstallOptions {
        dry_run: true,
        ..options(&[AgentKind::Shared, AgentKind::Codex])
    };
    let report = ops::install(&mut session, &opts, None, &mut never).unwrap();

    assert!(report.links.iter().all(|l| l.outcome.dry_run));
    assert!(report
        .links
        .iter()
        .all(|l| l.outcome.action == LinkAction::Created));
    assert!(fx.home("AGENTS.md").symlink_metadata().is_err());
    assert!(fx.home(".codex").symlink_metadata().is_err());
    assert!(!fx.layout.cache_dir().exists());
}

#[test]
fn test_excluded_descriptor_is_skipped() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");
    write(
        &fx.home(".agentlink-config.yaml"),
        "exclude_symlinks:\n  - ~/AGENTS.md\n",
    );

    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Shared]), None, &mut never).unwrap();
    assert_eq!(report.links[0].outcome.action, LinkAction::Skipped);
    assert!(fx.home("AGENTS.md").symlink_metadata().is_err());

    let status = ops::status(&fx.session(), &[AgentKind::Shared]).unwrap();
    assert!(status.links[0].excluded);
    assert_eq!(status.problems().count(), 0);
}

#[test]
fn test_overrides_link_settings_to_merged_cache() {
    let fx = Fixture::new();
    let base = fx.config("claude/settings.json");
    write(&base, r#"{"model": "sonnet", "env": {"A": "1"}}"#);
    write(
        &fx.home(".agentlink-config.yaml"),
        "settings_overrides:\n  claude:\n    model: opus\n",
    );

    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Claude]), None, &mut never).unwrap();
    assert!(!report.has_errors(), "{report:?}");

    let target = fx.home(".claude/settings.json");
    let cache = fx.layout.cache_dir().join("claude/settings.json");
    assert!(resolves_to(&target, &cache));
    let merged: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(merged, json!({"model": "opus", "env": {"A": "1"}}));
    assert_eq!(
        serde_json::from_str::<Value>(&fs::read_to_string(&base).unwrap()).unwrap(),
        json!({"model": "sonnet", "env": {"A": "1"}})
    );

    // Dropping the overrides relinks to the base and removes the cache.
    write(&fx.home(".agentlink-config.yaml"), "version: 1\n");
    let mut session = fx.session();
    let opts = InstallOptions {
        force: true,
        ..options(&[AgentKind::Claude])
    };
    let report = ops::install(&mut session, &opts, None, &mut never).unwrap();
    assert_eq!(report.orphaned_caches, vec!["claude"]);
    assert!(resolves_to(&target, &base));
    assert!(!cache.exists());
}

#[test]
fn test_cache_still_linked_is_kept_until_relinked() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");
    let base = fx.config("claude/settings.json");
    write(&base, r#"{"model": "sonnet"}"#);
    write(
        &fx.home(".agentlink-config.yaml"),
        "settings_overrides:\n  claude:\n    model: opus\n",
    );

    let mut session = fx.session();
    ops::install(&mut session, &options(&[AgentKind::Claude]), None, &mut never).unwrap();
    let target = fx.home(".claude/settings.json");
    let cache = fx.layout.cache_dir().join("claude/settings.json");
    assert!(resolves_to(&target, &cache));

    // Another agent's run must not pull the cache out from under the link.
    write(&fx.home(".agentlink-config.yaml"), "version: 1\n");
    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Shared]), None, &mut never).unwrap();
    assert!(report.orphaned_caches.is_empty());
    assert_eq!(report.kept_caches, vec!["claude"]);
    assert!(resolves_to(&target, &cache));

    // Moving its own link back to the base needs no confirmation.
    let mut asked = 0;
    let mut decline = |_: &ConfirmationRequest| {
        asked += 1;
        false
    };
    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Claude]), None, &mut decline).unwrap();
    assert_eq!(asked, 0);
    assert!(!report.has_errors(), "{report:?}");
    assert!(resolves_to(&target, &base));
    assert_eq!(report.orphaned_caches, vec!["claude"]);
    assert!(report.kept_caches.is_empty());
    assert!(!cache.exists());
}

#[test]
fn test_switching_profile_rebuilds_cache() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");
    let base = fx.config("codex/config.toml");
    write(&base, "model = \"o3\"\n");
    let work = fx.layout.profiles_dir().join("work.yaml");
    write(&work, "settings_overrides:\n  codex:\n    sandbox: work-only\n");
    let user_config = fx.home(".agentlink-config.yaml");
    write(&user_config, "settings_overrides:\n  codex:\n    model: o4\n");

    ops::switch_profile(&fx.layout, "work").unwrap();
    let mut session = fx.session();
    ops::install(&mut session, &options(&[AgentKind::Codex]), None, &mut never).unwrap();
    let cache = fx.layout.cache_dir().join("codex/config.toml");
    assert!(fs::read_to_string(&cache).unwrap().contains("work-only"));

    let past = SystemTime::now() - Duration::from_secs(3600);
    for path in [&base, &work, &user_config, &cache] {
        set_mtime(path, past);
    }

    ops::switch_profile(&fx.layout, "default").unwrap();
    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Codex]), None, &mut never).unwrap();
    assert!(!report.has_errors(), "{report:?}");

    let merged = fs::read_to_string(&cache).unwrap();
    assert!(!merged.contains("work-only"));
    assert!(merged.contains("o4"));
    assert!(resolves_to(&fx.home(".codex/config.toml"), &cache));
}

#[test]
fn test_malformed_base_fails_only_its_link() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "rules");
    write(
        &fx.home(".agentlink-config.yaml"),
        "settings_overrides:\n  codex:\n    model: o3\n",
    );
    write(&fx.config("codex/config.toml"), "not = [valid toml");

    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[AgentKind::Codex]), None, &mut never).unwrap();
    assert!(report.has_errors());

    let rules = report
        .links
        .iter()
        .find(|l| l.target_display == "~/.codex/AGENTS.md")
        .unwrap();
    assert_eq!(rules.outcome.action, LinkAction::Created);
    let settings = report
        .links
        .iter()
        .find(|l| l.target_display == "~/.codex/config.toml")
        .unwrap();
    assert!(settings.outcome.is_error());
}

#[test]
fn test_regular_file_needs_confirmation_and_is_backed_up() {
    let fx = Fixture::new();
    let source = fx.config("AGENTS.md");
    write(&source, "tracked");
    let target = fx.home("AGENTS.md");
    write(&target, "hand written");

    let mut session = fx.session();
    let mut asked = 0;
    let report = ops::install(
        &mut session,
        &options(&[AgentKind::Shared]),
        None,
        &mut |request| {
            asked += 1;
            assert_eq!(request.status, LinkStatus::NotSymlink);
            false
        },
    )
    .unwrap();
    assert_eq!(asked, 1);
    assert_eq!(report.links[0].outcome.action, LinkAction::Skipped);
    assert_eq!(fs::read_to_string(&target).unwrap(), "hand written");

    let report = ops::install(&mut session, &options(&[AgentKind::Shared]), None, &mut |_| true)
        .unwrap();
    assert_eq!(report.links[0].outcome.action, LinkAction::Updated);
    assert!(resolves_to(&target, &source));

    let backups = list_backups(&target).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "hand written");
}

#[test]
fn test_uninstall_leaves_foreign_links_alone() {
    let fx = Fixture::new();
    write(&fx.config("AGENTS.md"), "tracked");
    let elsewhere = fx.home("notes.md");
    write(&elsewhere, "mine");
    std::os::unix::fs::symlink(&elsewhere, fx.home("AGENTS.md")).unwrap();

    let mut session = fx.session();
    let opts = InstallOptions {
        force: true,
        ..options(&[AgentKind::Shared])
    };
    let report = ops::uninstall(&mut session, &opts, None, &mut never).unwrap();
    assert_eq!(report.links[0].outcome.action, LinkAction::Skipped);
    assert!(resolves_to(&fx.home("AGENTS.md"), &elsewhere));
}

#[test]
fn test_project_links() {
    let fx = Fixture::new();
    write(&fx.config("projects/app/AGENTS.md"), "project rules");
    let project = fx.home("code/app");
    fs::create_dir_all(&project).unwrap();
    write(
        &fx.home(".agentlink-config.yaml"),
        "projects:\n  app:\n    path: ~/code/app\n    exclude_symlinks:\n      - ~/code/app/GEMINI.md\n",
    );

    let mut session = fx.session();
    let report = ops::install(&mut session, &options(&[]), None, &mut never).unwrap();
    assert!(!report.has_errors());

    let source = fx.config("projects/app/AGENTS.md");
    assert!(resolves_to(&project.join("AGENTS.md"), &source));
    assert!(resolves_to(&project.join("CLAUDE.md"), &source));
    assert!(project.join("GEMINI.md").symlink_metadata().is_err());
    assert!(fx.home("AGENTS.md").symlink_metadata().is_err());
}

#[test]
fn test_reconcile_twice_keeps_link_untouched() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("repo/AGENTS.md");
    write(&source, "rules");
    let target = dir.path().join("home/AGENTS.md");

    let LinkResult::Outcome(first) = reconcile(&target, &source, false, false) else {
        panic!("created links never need confirmation");
    };
    assert_eq!(first.action, LinkAction::Created);
    let before = target.symlink_metadata().unwrap().modified().unwrap();

    let LinkResult::Outcome(second) = reconcile(&target, &source, false, false) else {
        panic!("correct links never need confirmation");
    };
    assert_eq!(second.action, LinkAction::AlreadyCorrect);
    assert_eq!(target.symlink_metadata().unwrap().modified().unwrap(), before);
}

#[test]
fn test_remove_symlink_refuses_regular_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("settings.json");
    write(&target, "{\"keep\": true}");

    let expected = dir.path().join("source.json");

    for force in [false, true] {
        let LinkResult::Outcome(outcome) = remove_symlink(&target, &expected, force) else {
            panic!("regular files are refused outright");
        };
        assert!(outcome.is_error());
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"keep\": true}");
    }
}

#[test]
fn test_broken_link_removed_without_confirmation() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("dangling");
    std::os::unix::fs::symlink(dir.path().join("gone"), &target).unwrap();

    let gone = dir.path().join("gone");
    let LinkResult::Outcome(outcome) = remove_symlink(&target, &gone, false) else {
        panic!("broken links are removed without asking");
    };
    assert_eq!(outcome.action, LinkAction::Removed);
    assert!(target.symlink_metadata().is_err());
}

#[test]
fn test_diff_against_base_then_cache() {
    let fx = Fixture::new();
    write(
        &fx.config("claude/settings.json"),
        "{\n  \"model\": \"sonnet\",\n  \"verbose\": false\n}\n",
    );
    write(
        &fx.home(".agentlink-config.yaml"),
        "settings_overrides:\n  claude:\n    model: opus\n",
    );

    let report = ops::diff(&fx.session(), &[AgentKind::Claude]).unwrap();
    assert_eq!(report.settings.len(), 1);
    let diff = &report.settings[0].diff;
    assert!(diff.contains("-  \"model\": \"sonnet\","));
    assert!(diff.contains("+  \"model\": \"opus\","));

    let mut session = fx.session();
    ops::install(&mut session, &options(&[AgentKind::Claude]), None, &mut never).unwrap();
    assert!(ops::diff(&fx.session(), &[AgentKind::Claude])
        .unwrap()
        .is_empty());
}
