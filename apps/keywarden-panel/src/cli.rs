use std::env;
use std::fs;

use anyhow::{Context, Result};

pub fn install_service() -> Result<()> {
    let exe_path = env::current_exe()?;
    let exe_name = exe_path.file_name().unwrap().to_str().unwrap();
    let working_dir = env::current_dir()?;

    let service_content = format!(
        r#"[Unit]
Description=Keywarden License Key Server
After=network.target

[Service]
Type=simple
User=root
WorkingDirectory={}
ExecStart={} serve
Restart=always
EnvironmentFile={}/.env

[Install]
WantedBy=multi-user.target
"#,
        working_dir.display(),
        exe_path.display(),
        working_dir.display()
    );

    let service_path = format!("/etc/systemd/system/{}.service", exe_name);

    if unsafe { libc::getuid() } != 0 {
        return Err(anyhow::anyhow!(
            "This command must be run as root (sudo) to install systemd service."
        ));
    }

    fs::write(&service_path, service_content)
        .context(format!("Failed to write service file to {}", service_path))?;

    println!("Systemd service created at {}", service_path);
    println!("You can now start the service using:");
    println!("  systemctl daemon-reload");
    println!("  systemctl enable --now {}", exe_name);

    Ok(())
}
