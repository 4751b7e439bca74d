//! Line-oriented operator prompts

use anyhow::{bail, Result};
use std::io::{self, Write};
use std::net::Ipv4Addr;

use crate::network::gateway::parse_ipv4;

pub trait Prompter {
    /// Print `prompt` and return the line typed in reply (without newline)
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Print a block of text for the operator
    fn show(&mut self, text: &str);
}

/// Prompts on stdout, reads stdin
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            bail!("Input closed while waiting for an answer");
        }
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }

    fn show(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Ask for a value, offering `default` in brackets; an empty answer takes it.
pub fn ask(prompter: &mut dyn Prompter, label: &str, default: Option<&str>) -> Result<String> {
    let prompt = match default {
        Some(d) => format!("{} [{}]: ", label, d),
        None => format!("{}: ", label),
    };
    let answer = prompter.read_line(&prompt)?;
    let answer = answer.trim();

    if answer.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Ask until the answer is a valid IPv4 address
pub fn ask_ipv4(prompter: &mut dyn Prompter, label: &str, default: Option<&str>) -> Result<Ipv4Addr> {
    loop {
        let answer = ask(prompter, label, default)?;
        match parse_ipv4(&answer) {
            Some(ip) => return Ok(ip),
            None => prompter.show("Invalid IP address..."),
        }
    }
}

/// Yes/no question defaulting to no
pub fn confirm(prompter: &mut dyn Prompter, question: &str) -> Result<bool> {
    let input = prompter.read_line(&format!("{} [y/N] ", question))?;
    let input = input.trim();
    Ok(input.eq_ignore_ascii_case("y") || input.eq_ignore_ascii_case("yes"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned answers and records everything asked and shown
    #[derive(Default)]
    pub(crate) struct ScriptedPrompter {
        answers: VecDeque<String>,
        pub prompts: Vec<String>,
        pub shown: Vec<String>,
    }

    impl ScriptedPrompter {
        pub(crate) fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn read_line(&mut self, prompt: &str) -> Result<String> {
            self.prompts.push(prompt.to_string());
            match self.answers.pop_front() {
                Some(answer) => Ok(answer),
                None => bail!("No scripted answer for {:?}", prompt),
            }
        }

        fn show(&mut self, text: &str) {
            self.shown.push(text.to_string());
        }
    }

    #[test]
    fn test_default_taken_on_empty_answer() {
        let mut p = ScriptedPrompter::new(&["", "  10.0.0.9 "]);
        assert_eq!(ask(&mut p, "eth0 IP address", Some("10.0.0.5")).unwrap(), "10.0.0.5");
        assert_eq!(ask(&mut p, "eth0 IP address", Some("10.0.0.5")).unwrap(), "10.0.0.9");
        assert_eq!(p.prompts[0], "eth0 IP address [10.0.0.5]: ");
    }

    #[test]
    fn test_invalid_ip_reprompts() {
        let mut p = ScriptedPrompter::new(&["300.1.1.1", "abc", "10.1.2.3"]);
        let ip = ask_ipv4(&mut p, "eth0 IP address", None).unwrap();

        assert_eq!(ip, Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(p.prompts.len(), 3);
        assert_eq!(p.shown, vec!["Invalid IP address...", "Invalid IP address..."]);
    }

    #[test]
    fn test_confirm() {
        let mut p = ScriptedPrompter::new(&["y", "YES", "", "n", "yep"]);
        assert!(confirm(&mut p, "Apply?").unwrap());
        assert!(confirm(&mut p, "Apply?").unwrap());
        assert!(!confirm(&mut p, "Apply?").unwrap());
        assert!(!confirm(&mut p, "Apply?").unwrap());
        assert!(!confirm(&mut p, "Apply?").unwrap());
        assert_eq!(p.prompts[0], "Apply? [y/N] ");
    }
}
