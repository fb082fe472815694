//! Run Use Case
//!
//! Orchestrates one invocation:
//! 1. Build the task graph (standard catalogue plus project tasks)
//! 2. Expand the requested task and decide whether a commit is needed
//! 3. Resolve the deployment context (fails before any host is touched)
//! 4. Run the leaves in order against the inventory

use tracing::info;

use crate::config::Project;
use crate::domain::ports::{BranchRef, BranchSource, VersionControl};
use crate::domain::services::{RevisionResolver, TaskGraph};
use crate::error::CutoverResult;

use super::context::{ContextResolver, DeploymentContext, RunRequest};
use super::recipe::standard_graph;
use super::runner::{needs_commit, render_plan, Body, TaskRunner};
use super::services::Services;

/// Branch listing through the configured version control backend
struct RemoteBranches<'a>(&'a dyn VersionControl);

impl BranchSource for RemoteBranches<'_> {
    fn branches(&self) -> CutoverResult<Vec<BranchRef>> {
        self.0.branches()
    }

    fn tags(&self) -> CutoverResult<Vec<BranchRef>> {
        self.0.tags()
    }
}

pub struct RunUseCase<'a> {
    project: &'a Project,
    services: Services,
    graph: TaskGraph<Body>,
}

impl<'a> RunUseCase<'a> {
    /// Fails on configuration problems in the task graph
    pub fn new(project: &'a Project, services: Services) -> CutoverResult<Self> {
        let graph = standard_graph(&project.config)?;
        Ok(Self {
            project,
            services,
            graph,
        })
    }

    pub fn graph(&self) -> &TaskGraph<Body> {
        &self.graph
    }

    /// Execution order of `task`, as printed by `--list`
    pub fn plan(&self, task: &str) -> CutoverResult<String> {
        render_plan(&self.graph, task)
    }

    /// Resolve the context for `request` without running anything
    pub fn resolve(&self, request: &RunRequest) -> CutoverResult<DeploymentContext> {
        let needs_commit = needs_commit(&self.graph, &request.task)?;
        let branches = RemoteBranches(self.services.vcs.as_ref());
        let revisions = RevisionResolver::new(&branches, self.services.live.as_ref());
        ContextResolver::new(self.project, revisions).resolve(request, needs_commit)
    }

    pub fn execute(&self, request: &RunRequest) -> CutoverResult<DeploymentContext> {
        let ctx = self.resolve(request)?;
        info!(
            stage = %ctx.stage,
            task = %request.task,
            commit = ctx.resolved_commit().unwrap_or("-"),
            "starting"
        );
        TaskRunner::new(&self.graph, &self.project.inventory, &self.services, &ctx)
            .run(&request.task)?;
        info!(stage = %ctx.stage, task = %request.task, "done");
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeExecutor, FakeLive, FakeVcs, Fakes, MemoryDatabases};
    use crate::config::parse_with_warnings;
    use crate::domain::entities::Inventory;
    use crate::error::CutoverError;
    use std::path::{Path, PathBuf};

    fn project(yaml: &str) -> Project {
        let (config, _) = parse_with_warnings(Path::new("deploy.yml"), yaml).unwrap();
        Project {
            config_file: Some(PathBuf::from("/srv/app/deploy.yml")),
            dir: PathBuf::from("/srv/app"),
            inventory: Inventory::local_for_stages(&config.stages),
            config,
            warnings: Vec::new(),
        }
    }

    fn request(stage: &str, task: &str) -> RunRequest {
        RunRequest {
            stage: stage.into(),
            task: task.into(),
            ..Default::default()
        }
    }

    const CONFIG: &str = "vcs:\n  path: /srv/repo.git\ndb:\n  name: app\noptions:\n  branch: main\n";

    fn fakes() -> Fakes {
        Fakes::new(FakeExecutor::default().fail("test -f /srv/app/shares/.syncignore", 1))
            .vcs(FakeVcs {
                branches: vec![BranchRef {
                    name: "main".into(),
                    commit: "c0ffee".into(),
                }],
                commits: vec!["c0ffee".into()],
                ..Default::default()
            })
            .live(FakeLive::with(&[("prod", "beef00")]))
            .databases(MemoryDatabases::with(&[("prod_app", "prod-data"), ("uat_app", "v1")]))
    }

    #[test]
    fn to_deploys_resolved_branch() {
        let project = project(CONFIG);
        let fakes = fakes();
        let run = RunUseCase::new(&project, fakes.services()).unwrap();

        let ctx = run.execute(&request("uat", "to")).unwrap();

        assert_eq!(ctx.resolved_commit(), Some("c0ffee"));
        assert!(fakes
            .vcs
            .calls()
            .contains(&"localuat: export c0ffee /srv/app/releases/uat/c0ffee []".to_string()));
        assert!(fakes
            .exec
            .commands_on("localuat")
            .contains(&"ln -sfn ../releases/uat/c0ffee /srv/app/stages/uat".to_string()));
        // synced from prod, then promoted
        assert_eq!(fakes.dbs.content("uat_app").as_deref(), Some("prod-data"));
        assert_eq!(fakes.dbs.content("uat_app_old").as_deref(), Some("v1"));
    }

    #[test]
    fn nested_tag_deploys_under_its_commit() {
        let project = project(CONFIG);
        let fakes = Fakes::new(FakeExecutor::default())
            .vcs(FakeVcs {
                tags: vec![BranchRef {
                    name: "rel/1.0".into(),
                    commit: "7a9c0de".into(),
                }],
                commits: vec!["7a9c0de".into()],
                ..Default::default()
            })
            .live(FakeLive::with(&[]));
        let run = RunUseCase::new(&project, fakes.services()).unwrap();
        let mut req = request("uat", "vcs:checkout");
        req.revision = Some("rel/1.0".into());

        let ctx = run.execute(&req).unwrap();

        assert_eq!(ctx.resolved_commit(), Some("7a9c0de"));
        assert!(fakes
            .exec
            .commands_on("localuat")
            .contains(&"mkdir -p /srv/app/releases/uat/7a9c0de".to_string()));
    }

    #[test]
    fn database_only_task_skips_revision_resolution() {
        let project = project("db:\n  name: app\n");
        let fakes = fakes();
        let run = RunUseCase::new(&project, fakes.services()).unwrap();
        let err = run.execute(&request("uat", "db:rollback")).unwrap_err();
        assert!(matches!(err, CutoverError::NothingToRollBack { .. }));
    }

    #[test]
    fn unknown_task_fails_before_resolution() {
        let project = project(CONFIG);
        let run = RunUseCase::new(&project, fakes().services()).unwrap();
        let err = run.execute(&request("uat", "deploy")).unwrap_err();
        assert!(matches!(err, CutoverError::UnknownTask { .. }));
    }

    #[test]
    fn unresolvable_revision_touches_no_host() {
        let project = project(CONFIG);
        let fakes = fakes();
        let run = RunUseCase::new(&project, fakes.services()).unwrap();
        let mut req = request("uat", "to");
        req.revision = Some("=dev".into());

        let err = run.execute(&req).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(fakes.exec.commands().is_empty());
    }

    #[test]
    fn plan_lists_leaves_with_targets() {
        let project = project(CONFIG);
        let run = RunUseCase::new(&project, fakes().services()).unwrap();
        let plan = run.plan("release").unwrap();
        let lines: Vec<&str> = plan.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("release:migrate") && lines[0].contains("serving (once)"));
        assert!(lines[2].contains("db:rollout") && lines[2].contains("data (once)"));
    }
}
