/// The OS-service (launchd-style) installer/uninstaller is an external
/// collaborator spec.md §1 explicitly places out of scope; this module is
/// only the seam the Control Socket's `service*` commands dispatch through,
/// not a real service manager.
pub fn handle(command: &str) -> String {
    match command {
        "serviceStatus" => "service control is not installed by this build".to_owned(),
        "serviceInstall" | "serviceStart" | "serviceStop" | "serviceRestart"
        | "serviceUninstall" => {
            format!("error: {command} is not supported by this build")
        }
        other => format!("error: unknown service command `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reports_unavailable_without_erroring() {
        assert!(handle("serviceStatus").contains("not installed"));
    }

    #[test]
    fn mutating_commands_report_unsupported() {
        assert!(handle("serviceInstall").starts_with("error:"));
    }
}
