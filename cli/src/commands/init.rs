use anyhow::Result;

use weighlog_core::service::WeightLogService;

use crate::config::Config;

use super::helpers::format_date;

pub(crate) fn cmd_init(config: &Config, json: bool) -> Result<()> {
    let svc = WeightLogService::new(&config.data_path);
    let created = svc.initialize(config.log_start, config.log_end)?;
    let file = config.data_file_label();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "file": file,
                "created": created,
                "start": format_date(config.log_start),
                "end": format_date(config.log_end),
            })
        );
    } else if created {
        println!("CSV file created: {file}");
        println!(
            "  Rows: {} to {}",
            format_date(config.log_start),
            format_date(config.log_end)
        );
    } else {
        println!("CSV file already exists: {file}");
    }

    Ok(())
}
