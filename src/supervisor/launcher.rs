//! Client process launching.
//!
//! Builds the openvpn command line (with privilege elevation when we are not
//! root), writes the ephemeral credentials file, and starts the child as a
//! new process-group leader so teardown can signal the whole tree.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use tempfile::TempPath;
use thiserror::Error;

use crate::config::Settings;
use crate::constants;
use crate::state::ConnectionProfile;

/// Errors that prevent the client process from starting.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("client binary '{0}' not found - install the openvpn package")]
    BinaryMissing(String),
    #[error("permission denied starting the client - run as root or install pkexec/sudo")]
    PermissionDenied,
    #[error("failed to write credentials file: {0}")]
    Credentials(io::Error),
    #[error("failed to start the client: {0}")]
    Spawn(io::Error),
}

/// How the client command is elevated, decided once per launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Elevation {
    /// Already root; run the client directly.
    None,
    /// Interactive graphical elevation via pkexec.
    Pkexec,
    /// Classic sudo.
    Sudo,
}

/// Whether the current process runs with effective uid 0.
#[allow(unsafe_code)]
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Check PATH for an executable by name.
pub fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}

/// Pick the elevation wrapper for the current privilege level.
pub fn detect_elevation() -> Elevation {
    if is_root() {
        Elevation::None
    } else if binary_on_path("pkexec") {
        Elevation::Pkexec
    } else {
        Elevation::Sudo
    }
}

/// Build the full argv for the client, elevation prefix included.
pub(crate) fn build_argv(
    settings: &Settings,
    config_path: &Path,
    auth_path: Option<&Path>,
    elevation: Elevation,
) -> Vec<String> {
    let mut argv = Vec::new();
    match elevation {
        Elevation::None => {}
        Elevation::Pkexec => argv.push("pkexec".to_string()),
        Elevation::Sudo => argv.push("sudo".to_string()),
    }
    argv.push(settings.client_binary.clone());
    argv.extend([
        "--config".to_string(),
        config_path.display().to_string(),
        "--verb".to_string(),
        constants::CLIENT_VERBOSITY.to_string(),
        "--script-security".to_string(),
        constants::SCRIPT_SECURITY.to_string(),
        "--up".to_string(),
        settings.up_script.display().to_string(),
        "--down".to_string(),
        settings.down_script.display().to_string(),
    ]);
    if let Some(auth) = auth_path {
        argv.push("--auth-user-pass".to_string());
        argv.push(auth.display().to_string());
    }
    argv
}

/// Write the two-line credentials file, restricted to owner read/write.
///
/// The returned [`TempPath`] deletes the file when dropped or closed; a write
/// failure drops the handle early, removing the partial file.
pub fn write_auth_file(username: &str, password: &str) -> Result<TempPath, LaunchError> {
    let mut file = tempfile::Builder::new()
        .suffix(constants::AUTH_FILE_SUFFIX)
        .tempfile()
        .map_err(LaunchError::Credentials)?;

    write!(file, "{username}\n{password}\n").map_err(LaunchError::Credentials)?;
    file.flush().map_err(LaunchError::Credentials)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(LaunchError::Credentials)?;
    }

    Ok(file.into_temp_path())
}

/// Start the client for `profile`.
///
/// Returns the running child and the credentials temp path when the profile
/// carried credentials. The child leads its own process group.
pub fn launch(
    settings: &Settings,
    profile: &ConnectionProfile,
) -> Result<(Child, Option<TempPath>, Vec<String>), LaunchError> {
    let auth_path = if profile.has_credentials() {
        let username = profile.username.as_deref().unwrap_or_default();
        let password = profile.password.as_deref().unwrap_or_default();
        Some(write_auth_file(username, password)?)
    } else {
        None
    };

    let argv = build_argv(
        settings,
        &profile.config_path,
        auth_path.as_deref(),
        detect_elevation(),
    );

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LaunchError::BinaryMissing(argv[0].clone()),
        io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied,
        _ => LaunchError::Spawn(e),
    })?;

    Ok((child, auth_path, argv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_argv_direct_when_root() {
        let argv = build_argv(
            &settings(),
            Path::new("/etc/vpn/client.ovpn"),
            None,
            Elevation::None,
        );
        assert_eq!(
            argv,
            vec![
                "openvpn",
                "--config",
                "/etc/vpn/client.ovpn",
                "--verb",
                "3",
                "--script-security",
                "2",
                "--up",
                "/etc/openvpn/update-resolv-conf",
                "--down",
                "/etc/openvpn/update-resolv-conf",
            ]
        );
    }

    #[test]
    fn test_argv_elevation_prefix() {
        let argv = build_argv(
            &settings(),
            Path::new("/etc/vpn/client.ovpn"),
            None,
            Elevation::Pkexec,
        );
        assert_eq!(argv[0], "pkexec");
        assert_eq!(argv[1], "openvpn");

        let argv = build_argv(
            &settings(),
            Path::new("/etc/vpn/client.ovpn"),
            None,
            Elevation::Sudo,
        );
        assert_eq!(argv[0], "sudo");
    }

    #[test]
    fn test_argv_appends_auth_file() {
        let argv = build_argv(
            &settings(),
            Path::new("/etc/vpn/client.ovpn"),
            Some(Path::new("/tmp/auth123")),
            Elevation::None,
        );
        let pos = argv.iter().position(|a| a == "--auth-user-pass").unwrap();
        assert_eq!(argv[pos + 1], "/tmp/auth123");
    }

    #[test]
    fn test_auth_file_content_and_removal() {
        let path = write_auth_file("alice", "s3cret").unwrap();
        let on_disk = PathBuf::from(&*path);

        let content = std::fs::read_to_string(&on_disk).unwrap();
        assert_eq!(content, "alice\ns3cret\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&on_disk).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(path);
        assert!(!on_disk.exists());
    }

    #[test]
    fn test_binary_on_path_finds_sh() {
        assert!(binary_on_path("sh"));
        assert!(!binary_on_path("definitely-not-a-real-binary-0000"));
    }
}
