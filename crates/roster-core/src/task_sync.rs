//! Tracker task sync: stories tagged for the bot get the template tasks for
//! their current status, once per (story, status).

use crate::config::TrackerConfig;
use crate::error::{Result, RosterError};
use crate::ledger::Ledger;
use crate::plan::Action;
use crate::tracker::{Project, Story, Task, TrackerClient};
use std::collections::BTreeMap;

/// Template tasks by story status.
pub type Templates = BTreeMap<u64, Vec<Task>>;

/// Planned tasks for one story in one status.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryPlan {
    pub story: u64,
    pub status: u64,
    pub actions: Vec<Action>,
}

impl StoryPlan {
    pub fn ledger_key(&self) -> String {
        ledger_key(self.story)
    }
}

pub fn ledger_key(story: u64) -> String {
    format!("story-{story}")
}

/// The configured project. Any other name is a validation error.
pub fn find_project<'a>(projects: &'a [Project], cfg: &TrackerConfig) -> Result<&'a Project> {
    projects
        .iter()
        .find(|p| p.name == cfg.project)
        .ok_or_else(|| {
            RosterError::Validation(format!("tracker project '{}' not found", cfg.project))
        })
}

/// Collect the tasks of every template story, keyed by the template's status.
pub fn load_templates(
    tracker: &TrackerClient,
    stories: &[Story],
    cfg: &TrackerConfig,
) -> Result<Templates> {
    let mut templates = Templates::new();
    for story in stories.iter().filter(|s| s.subject == cfg.template_subject) {
        let tasks = tracker.tasks(story.id)?;
        tracing::debug!("template for status {} has {} tasks", story.status, tasks.len());
        templates.insert(story.status, tasks);
    }
    Ok(templates)
}

pub fn plan(
    project: &Project,
    stories: &[Story],
    templates: &Templates,
    cfg: &TrackerConfig,
    ledger: &Ledger,
) -> Vec<StoryPlan> {
    let mut plans = Vec::new();
    for story in stories.iter().filter(|s| s.has_tag(&cfg.tag)) {
        let state = story.status.to_string();
        if ledger.already_done(&ledger_key(story.id), &state) {
            tracing::debug!(
                "tasks for story {} already created in status {}",
                story.subject,
                story.status
            );
            continue;
        }
        let Some(template) = templates.get(&story.status) else {
            tracing::info!("no template for story {}", story.subject);
            continue;
        };
        let actions = template
            .iter()
            .map(|task| Action::CreateTask {
                project: project.id,
                story: story.id,
                story_status: story.status,
                subject: task.subject.clone(),
                status: task.status,
            })
            .collect();
        plans.push(StoryPlan {
            story: story.id,
            status: story.status,
            actions,
        });
    }
    plans
}

/// Mark each story whose planned tasks were all applied.
pub fn record(plans: &[StoryPlan], applied: &[Action], ledger: &mut Ledger) {
    for plan in plans {
        if plan.actions.iter().all(|a| applied.contains(a)) {
            ledger.mark_done(&plan.ledger_key(), &plan.status.to_string());
        } else {
            tracing::warn!(
                "story {} not recorded: some tasks were not created",
                plan.story
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Tag;
    use tempfile::TempDir;

    fn cfg() -> TrackerConfig {
        serde_json::from_value(serde_json::json!({
            "base_url": "http://unused",
            "username": "u",
            "password": "p"
        }))
        .unwrap()
    }

    fn story(id: u64, subject: &str, status: u64, tagged: bool) -> Story {
        Story {
            id,
            subject: subject.into(),
            status,
            tags: if tagged {
                vec![Tag("bot-managed".into(), None)]
            } else {
                vec![]
            },
        }
    }

    fn templates() -> Templates {
        let mut t = Templates::new();
        t.insert(
            5,
            vec![
                Task {
                    subject: "Send welcome".into(),
                    status: 1,
                },
                Task {
                    subject: "Book induction".into(),
                    status: 1,
                },
            ],
        );
        t
    }

    #[test]
    fn project_must_exist() {
        let projects = vec![Project {
            id: 1,
            name: "Other".into(),
        }];
        assert!(matches!(
            find_project(&projects, &cfg()),
            Err(RosterError::Validation(_))
        ));
    }

    #[test]
    fn story_gets_tasks_once_per_status() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        let project = Project {
            id: 3,
            name: "Attendee".into(),
        };
        let stories = vec![
            story(42, "Alice", 5, true),
            story(43, "Bob", 5, false),
            story(44, "Carol", 6, true),
        ];

        let plans = plan(&project, &stories, &templates(), &cfg(), &ledger);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].story, 42);
        assert_eq!(plans[0].actions.len(), 2);

        record(&plans, &plans[0].actions, &mut ledger);
        assert!(ledger.already_done("story-42", "5"));
        assert!(plan(&project, &stories, &templates(), &cfg(), &ledger).is_empty());

        let moved = vec![story(42, "Alice", 6, true)];
        let mut t = templates();
        t.insert(6, vec![]);
        assert_eq!(plan(&project, &moved, &t, &cfg(), &ledger).len(), 1);
    }

    #[test]
    fn partial_apply_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        let project = Project {
            id: 3,
            name: "Attendee".into(),
        };
        let plans = plan(
            &project,
            &[story(42, "Alice", 5, true)],
            &templates(),
            &cfg(),
            &ledger,
        );
        record(&plans, &plans[0].actions[..1], &mut ledger);
        assert!(!ledger.already_done("story-42", "5"));
    }
}
