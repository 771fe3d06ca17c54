//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (由 `validator` 派生规则给出)
//! - max_round_trip_ms 不得超过 probe_timeout_ms
//! - 宽表布局要求 bucket_ms > 0
//! - 导出目录不能为空
//! - 模拟传感器类型不得重复

use std::collections::HashSet;

use contracts::{ContractError, ExportLayout, LinkConfig};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// 校验 LinkConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LinkConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_clock_sync(config)?;
    validate_export(config)?;
    validate_simulation(config)?;
    Ok(())
}

/// 派生规则；多处违规时按字段路径排序取第一个
fn validate_ranges(config: &LinkConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| (String::from("<config>"), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| (path, describe(e))),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(inner, &format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn describe(error: &ValidationError) -> String {
    let rule = error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("{} check failed", error.code));
    match error.params.get("value") {
        Some(value) => format!("{rule} (got {value})"),
        None => rule,
    }
}

/// 校验时钟同步配置
fn validate_clock_sync(config: &LinkConfig) -> Result<(), ContractError> {
    let sync = &config.clock_sync;
    if let Some(max_rtt) = sync.max_round_trip_ms {
        if max_rtt > sync.probe_timeout_ms {
            return Err(ContractError::config_validation(
                "clock_sync.max_round_trip_ms",
                format!(
                    "max_round_trip_ms ({max_rtt}) must be <= probe_timeout_ms ({})",
                    sync.probe_timeout_ms
                ),
            ));
        }
    }
    Ok(())
}

/// 校验导出配置
fn validate_export(config: &LinkConfig) -> Result<(), ContractError> {
    let export = &config.export;
    if export.layout == ExportLayout::Wide && export.bucket_ms == 0 {
        return Err(ContractError::config_validation(
            "export.bucket_ms",
            "bucket_ms must be > 0 for the wide layout",
        ));
    }
    if export.directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "export.directory",
            "export directory cannot be empty",
        ));
    }
    Ok(())
}

/// 校验模拟传感器
fn validate_simulation(config: &LinkConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sensor) in config.simulation.sensors.iter().enumerate() {
        if !seen.insert(sensor.kind) {
            return Err(ContractError::config_validation(
                format!("simulation.sensors[{idx}].kind"),
                format!("duplicate sensor kind '{}'", sensor.kind),
            ));
        }
    }
    Ok(())
}
