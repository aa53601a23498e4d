// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::VecDeque;

/// Lifecycle of a program invocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    Loaded,
    Running,
    Paused,
    Aborted,
    Errored,
    Killed,
    Completed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Aborted | Self::Errored | Self::Killed | Self::Completed
        )
    }
}

/// Why an invocation errored before the program ever ran.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContextError {
    AuthenticationRequired,
    ProgramNotFound,
    ProgramNotSpecified,
}

/// The runtime value that holds a program's state, outputs, return value and terminal
/// condition. Output lines accumulate in arrival order (the "feedback" buffer); the bridge
/// relays them to the owning session as they appear.
#[derive(Clone, Debug)]
pub struct ExecutionContext<T> {
    pub program_name: String,
    pub state: TaskState,
    pub error: Option<ContextError>,
    pub error_message: Option<String>,
    pub return_value: Option<T>,
    pub output: VecDeque<String>,
}

impl<T> ExecutionContext<T> {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            state: TaskState::Loaded,
            error: None,
            error_message: None,
            return_value: None,
            output: VecDeque::new(),
        }
    }

    /// A terminal errored context; nothing was (or will be) scheduled.
    pub fn error(
        program_name: impl Into<String>,
        error: ContextError,
        message: impl Into<String>,
    ) -> Self {
        Self {
            program_name: program_name.into(),
            state: TaskState::Errored,
            error: Some(error),
            error_message: Some(message.into()),
            return_value: None,
            output: VecDeque::new(),
        }
    }

    pub fn push_output(&mut self, line: String) {
        self.output.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_loaded() {
        let ctx = ExecutionContext::<String>::new("look");
        assert_eq!(ctx.state, TaskState::Loaded);
        assert!(!ctx.state.is_terminal());
        assert!(ctx.error.is_none());
    }

    #[test]
    fn test_error_context_is_terminal() {
        let ctx = ExecutionContext::<String>::error(
            "",
            ContextError::ProgramNotSpecified,
            "no program named by the link",
        );
        assert_eq!(ctx.state, TaskState::Errored);
        assert!(ctx.state.is_terminal());
        assert_eq!(ctx.error, Some(ContextError::ProgramNotSpecified));
    }

    #[test]
    fn test_terminal_set() {
        for s in [
            TaskState::Aborted,
            TaskState::Errored,
            TaskState::Killed,
            TaskState::Completed,
        ] {
            assert!(s.is_terminal());
        }
        for s in [TaskState::Loaded, TaskState::Running, TaskState::Paused] {
            assert!(!s.is_terminal());
        }
    }
}
