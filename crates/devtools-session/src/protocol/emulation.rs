// Emulation domain

use crate::protocol::command::Command;

/// Overrides the viewport size, scale factor and mobile emulation
pub fn set_device_metrics_override(
    width: u32,
    height: u32,
    device_scale_factor: f64,
    mobile: bool,
) -> Command {
    Command::new("Emulation.setDeviceMetricsOverride")
        .param("width", width)
        .param("height", height)
        .param("deviceScaleFactor", device_scale_factor)
        .param("mobile", mobile)
}

pub fn clear_device_metrics_override() -> Command {
    Command::new("Emulation.clearDeviceMetricsOverride")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_and_clear() {
        let set = set_device_metrics_override(800, 600, 2.0, true);
        assert_eq!(set.params()["deviceScaleFactor"], 2.0);
        assert_eq!(set.params()["mobile"], true);

        let clear = clear_device_metrics_override();
        assert_eq!(clear.method(), "Emulation.clearDeviceMetricsOverride");
        assert!(clear.params().is_empty());
    }
}
