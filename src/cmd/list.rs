//! Cached-operation listing — `sandctl list`.

use anyhow::Result;

use sandctl::cache::ResumeCache;

use super::super::Cli;

pub fn cmd_list(cli: &Cli) -> Result<i32> {
    let dir = super::resolve_config_dir(cli)?;
    let cache = ResumeCache::open_in(&dir)?;

    if cache.is_empty() {
        println!("No resumable sandbox operations found");
        return Ok(0);
    }

    println!("{} resumable operation(s):", cache.len());
    for (key, record) in cache.records() {
        println!(
            "  {}  {}  {} ({}%)  job {}  updated {}",
            key,
            record.entry.action,
            record.entry.job.status,
            record.entry.job.progress_percent,
            record.entry.job.job_id,
            record.updated_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(0)
}
