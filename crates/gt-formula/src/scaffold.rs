//! Starter templates written by `gt formula create`.

use std::fmt;
use std::str::FromStr;

/// Kinds of formula `gt formula create` can scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldKind {
    Task,
    Workflow,
    Patrol,
    Convoy,
}

impl ScaffoldKind {
    pub const ALL: [ScaffoldKind; 4] = [Self::Task, Self::Workflow, Self::Patrol, Self::Convoy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Workflow => "workflow",
            Self::Patrol => "patrol",
            Self::Convoy => "convoy",
        }
    }

    /// Source text of a new formula called `name`.
    pub fn render(self, name: &str) -> String {
        let title = formula_title(name);
        let kind = self.as_str();
        let head = format!("# Formula: {name}\n# Type: {kind}\n# Created by: gt formula create\n\n");
        let body = match self {
            Self::Task => task_body(name, &title),
            Self::Workflow => workflow_body(name, &title),
            Self::Patrol => patrol_body(name, &title),
            Self::Convoy => convoy_body(name, &title),
        };
        format!("{head}{body}")
    }
}

impl fmt::Display for ScaffoldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaffoldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown formula type: {s} (use: task, workflow, patrol, or convoy)"))
    }
}

/// `my-new-thing` becomes `My New Thing`.
pub fn formula_title(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn task_body(name: &str, title: &str) -> String {
    format!(
        r#"description = """
{title} task.

Describe what this task accomplishes.
"""
formula = "{name}"
type = "task"
version = 1

[[steps]]
id = "do-task"
title = "Do the work"
description = """
Carry out the task.

1. Read the requirements
2. Make the change
3. Check the result
"""

# [vars.issue]
# description = "Issue to work on"
# required = true
"#
    )
}

fn workflow_body(name: &str, title: &str) -> String {
    format!(
        r#"description = """
{title} workflow.

Steps run in dependency order.
"""
formula = "{name}"
type = "workflow"
version = 1

[[steps]]
id = "setup"
title = "Prepare"
description = "Get the environment ready."

[[steps]]
id = "implement"
title = "Implement"
needs = ["setup"]
description = "Make the change."

[[steps]]
id = "test"
title = "Test"
needs = ["implement"]
description = "Run the test suites and look for regressions."

[[steps]]
id = "complete"
title = "Finish"
needs = ["test"]
description = "Commit and clean up."

[vars.issue]
description = "Issue to work on"
required = true
"#
    )
}

fn patrol_body(name: &str, title: &str) -> String {
    format!(
        r#"description = """
{title} patrol.

Runs as a repeating cycle. Patrol runs are ephemeral and are not synced.
"""
formula = "{name}"
type = "patrol"
version = 1

[[steps]]
id = "check"
title = "Patrol check"
description = """
Inspect health indicators and note anything that needs attention.
Escalate critical findings.
"""

# [[steps]]
# id = "remediate"
# title = "Fix findings"
# needs = ["check"]
"#
    )
}

fn convoy_body(name: &str, title: &str) -> String {
    format!(
        r#"description = """
{title} convoy.

Parallel legs converge on a synthesis step.
"""
formula = "{name}"
type = "convoy"
version = 1

[[legs]]
id = "first"
title = "First angle"
focus = "What this leg looks at"
description = "Examine the target from the first angle."

[[legs]]
id = "second"
title = "Second angle"
focus = "What this leg looks at"
description = "Examine the target from the second angle."

[synthesis]
title = "Combine findings"
description = "Merge the findings from every leg into one report."
depends_on = ["first", "second"]

[prompts]
base = """
You are working the {{{{.leg.title}}}} leg of {{{{.formula_name}}}} on {{{{.target_description}}}}.

Focus: {{{{.leg.focus}}}}
"""
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn title_case() {
        assert_eq!(formula_title("my-new_thing"), "My New Thing");
        assert_eq!(formula_title("x"), "X");
        assert_eq!(formula_title("--"), "");
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("patrol".parse::<ScaffoldKind>(), Ok(ScaffoldKind::Patrol));
        assert!("swarm".parse::<ScaffoldKind>().unwrap_err().contains("unknown formula type: swarm"));
    }

    #[test]
    fn every_template_parses_with_its_name_and_type() {
        for kind in ScaffoldKind::ALL {
            let doc = parse(kind.render("my-flow").as_bytes());
            assert_eq!(doc.name, "my-flow");
            assert_eq!(doc.type_name(), kind.as_str());
            assert!(doc.description.starts_with("My Flow "));
        }
    }

    #[test]
    fn convoy_template_keeps_prompt_placeholders() {
        let doc = parse(ScaffoldKind::Convoy.render("c").as_bytes());
        assert_eq!(doc.legs.len(), 2);
        assert!(doc.base_prompt().unwrap_or("").contains("{{.leg.title}}"));
    }
}
