//! System prompts and the opening user turn for each run mode.

use crate::task::TaskDefinition;
use chrono::NaiveDate;

/// What the run is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    /// Carry out the task and answer `Success` or `Fail`
    #[default]
    Execute,
    /// Explore the site and write a test plan file
    Plan,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Execute => "execute",
            RunMode::Plan => "plan",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the system prompt for `mode`, dated `today`.
pub fn system_prompt(mode: RunMode, today: NaiveDate) -> String {
    let date = today.format("%A, %B %-d, %Y");
    match mode {
        RunMode::Execute => format!(
            "<SYSTEM_CAPABILITY>
* You are an automated end-to-end UI tester driving a Chrome browser with internet access.
* The `browser` tool can take screenshots, click, move the mouse, scroll, type text, press keys, navigate, and read the page title or content.
* The `script_writer` tool writes files when you need to record a script or notes.
* Tool calls are slow. When the next few steps are clear, request several tool calls in one turn.
* The test case ends with an assertion. Once every step is done, reply with exactly one word and no tool calls: `Success` if the assertion held, `Fail` otherwise.
* The current date is {date}.
</SYSTEM_CAPABILITY>"
        ),
        RunMode::Plan => format!(
            "<SYSTEM_CAPABILITY>
* You generate end-to-end UI test plans using a Chrome browser with internet access.
* The `browser` tool can take screenshots, click, move the mouse, scroll, type text, press keys, navigate, and read the page title or content.
* Tool calls are slow. When the next few steps are clear, request several tool calls in one turn.
* The current date is {date}.
</SYSTEM_CAPABILITY>

<WORKFLOW>
* You are given a website and a feature to test on it.
* Explore the site with the browser and work out a step-by-step plan that exercises the feature.
* Say which actions to take (clicks, typing, key presses) and when to take a screenshot to check the page state.
* Write the plan with the `script_writer` tool to a file named `plan_<feature>_<YYYYMMDD>_<HHMMSS>.txt`, structured as:
    Website: <website_url>
    Instructions: <feature>
* Once the file is written, reply with exactly one word and no tool calls: `Success`, or `Fail` if the plan could not be written.
</WORKFLOW>

<STYLE>
* Keep the steps short. Leave out anything not needed to follow them.
* Put each step on its own line under the previous one. Do not number the steps.
</STYLE>"
        ),
    }
}

/// Opening user turn for `task`.
pub fn initial_prompt(task: &TaskDefinition, mode: RunMode) -> String {
    match mode {
        RunMode::Execute => format!(
            "Test case: {}\nThe browser is open at {}.\n\n{}",
            task.label, task.website_url, task.instructions
        ),
        RunMode::Plan => format!(
            "Website: {}\nFeature to test: {}\n\n{}",
            task.website_url, task.label, task.instructions
        ),
    }
}
