//! CPU tuning around the run loop
//!
//! Turbo and frequency scaling add variance between runs. When enabled in
//! `[Tuning]`, turbo is switched off and the frequency pinned for the
//! duration of the loop. [`TweakGuard`] restores the normal settings when it
//! goes out of scope, including when the loop aborts with an error.

use crate::config::TuningConfig;
use deflatebench_core::{CommandLine, Redirect};
use tracing::{debug, warn};

const SUDO: &str = "sudo";
const TURBOCTL: &str = "/usr/bin/turboctl";
const CPUPOWER: &str = "/usr/bin/cpupower";

/// A reversible system adjustment
pub trait SystemTweak {
    /// Apply the adjustment
    fn engage(&self);
    /// Undo it
    fn restore(&self);
}

/// Holds a [`SystemTweak`] engaged until dropped
pub struct TweakGuard<'a> {
    tweak: &'a dyn SystemTweak,
}

impl<'a> TweakGuard<'a> {
    /// Engage `tweak`; it is restored when the guard drops
    pub fn engage(tweak: &'a dyn SystemTweak) -> Self {
        tweak.engage();
        Self { tweak }
    }
}

impl Drop for TweakGuard<'_> {
    fn drop(&mut self) {
        self.tweak.restore();
    }
}

/// No adjustment at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTweak;

impl SystemTweak for NoTweak {
    fn engage(&self) {}
    fn restore(&self) {}
}

/// turboctl / cpupower tuning driven by `[Tuning]`
#[derive(Debug, Clone)]
pub struct CpuTweak {
    tuning: TuningConfig,
}

impl CpuTweak {
    /// Create from tuning settings
    pub fn new(tuning: TuningConfig) -> Self {
        Self { tuning }
    }

    /// Commands run by [`SystemTweak::engage`]
    pub fn engage_commands(&self) -> Vec<CommandLine> {
        let mut commands = Vec::new();
        if self.tuning.use_turboctl {
            commands.push(sudo(TURBOCTL).arg("off"));
        }
        if self.tuning.use_cpupower {
            let speed = khz(self.tuning.cpu_bench_speed);
            commands.push(sudo(CPUPOWER).args([
                "frequency-set",
                "-g",
                "performance",
                "--min",
                speed.as_str(),
                "--max",
                speed.as_str(),
            ]));
            commands.push(sudo(CPUPOWER).args(["idle-set", "-D", "2"]));
        }
        commands
    }

    /// Commands run by [`SystemTweak::restore`]
    pub fn restore_commands(&self) -> Vec<CommandLine> {
        let mut commands = Vec::new();
        if self.tuning.use_turboctl {
            commands.push(sudo(TURBOCTL).arg("on"));
        }
        if self.tuning.use_cpupower {
            let min = khz(self.tuning.cpu_std_minspeed);
            let max = khz(self.tuning.cpu_std_maxspeed);
            commands.push(sudo(CPUPOWER).args([
                "frequency-set",
                "--min",
                min.as_str(),
                "--max",
                max.as_str(),
            ]));
            commands.push(sudo(CPUPOWER).args(["idle-set", "-E"]));
        }
        commands
    }
}

impl SystemTweak for CpuTweak {
    fn engage(&self) {
        debug!("engaging cpu tweaks");
        run_all(&self.engage_commands(), Redirect::Null);
    }

    fn restore(&self) {
        debug!("restoring cpu settings");
        run_all(&self.restore_commands(), Redirect::Inherit);
    }
}

fn sudo(program: &str) -> CommandLine {
    CommandLine::new(SUDO).arg(program)
}

/// Config speeds are MHz; cpupower takes kHz.
fn khz(mhz: u32) -> String {
    (u64::from(mhz) * 1000).to_string()
}

fn run_all(commands: &[CommandLine], stdout: Redirect<'_>) {
    for command in commands {
        if let Err(e) = command.run(stdout) {
            warn!("cpu tweak failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn rendered(commands: &[CommandLine]) -> Vec<String> {
        commands.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_disabled_tuning_runs_nothing() {
        let tweak = CpuTweak::new(TuningConfig::default());
        assert!(tweak.engage_commands().is_empty());
        assert!(tweak.restore_commands().is_empty());
    }

    #[test]
    fn test_cpupower_commands_use_khz() {
        let tweak = CpuTweak::new(TuningConfig {
            use_turboctl: true,
            use_cpupower: true,
            ..TuningConfig::default()
        });

        assert_eq!(
            rendered(&tweak.engage_commands()),
            vec![
                "sudo /usr/bin/turboctl off",
                "sudo /usr/bin/cpupower frequency-set -g performance --min 2000000 --max 2000000",
                "sudo /usr/bin/cpupower idle-set -D 2",
            ]
        );
        assert_eq!(
            rendered(&tweak.restore_commands()),
            vec![
                "sudo /usr/bin/turboctl on",
                "sudo /usr/bin/cpupower frequency-set --min 1000000 --max 2200000",
                "sudo /usr/bin/cpupower idle-set -E",
            ]
        );
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<&'static str>>);

    impl SystemTweak for Recorder {
        fn engage(&self) {
            self.0.borrow_mut().push("engage");
        }
        fn restore(&self) {
            self.0.borrow_mut().push("restore");
        }
    }

    #[test]
    fn test_guard_restores_on_early_return() {
        fn session(tweak: &dyn SystemTweak, fail: bool) -> Result<(), &'static str> {
            let _guard = TweakGuard::engage(tweak);
            if fail {
                return Err("tool failed");
            }
            Ok(())
        }

        let recorder = Recorder::default();
        assert!(session(&recorder, true).is_err());
        assert_eq!(*recorder.0.borrow(), vec!["engage", "restore"]);
    }
}
