//! Key/value parameters attached to designs, modules and resources.
use linked_hash_map::LinkedHashMap;

pub const RESET_POLARITY: &str = "RESET-POLARITY";
pub const RESET_NAME: &str = "RESET-NAME";
pub const MODULE_NAME_PREFIX: &str = "MODULE-NAME-PREFIX";
pub const PORT_NAME_PREFIX: &str = "PORT-NAME-PREFIX";
pub const SRAM_PORT_INDEX: &str = "SRAM-PORT-INDEX";
pub const PLATFORM_FAMILY: &str = "PLATFORM-FAMILY";
pub const PLATFORM_NAME: &str = "PLATFORM-NAME";
pub const MAX_DELAY_PS: &str = "MAX-DELAY-PS";
pub const ADDR_WIDTH: &str = "ADDR-WIDTH";
pub const EXT_INPUT_PORT: &str = "INPUT";
pub const EXT_OUTPUT_PORT: &str = "OUTPUT";
pub const WIDTH: &str = "WIDTH";
pub const INITIAL_VALUE: &str = "INITIAL-VALUE";
pub const DEFAULT_VALUE: &str = "DEFAULT-VALUE";
pub const EMBEDDED_MODULE: &str = "EMBEDDED-MODULE";
pub const EMBEDDED_MODULE_FILE: &str = "EMBEDDED-MODULE-FILE";
pub const EMBEDDED_MODULE_CLOCK: &str = "EMBEDDED-MODULE-CLOCK";
pub const EMBEDDED_MODULE_RESET: &str = "EMBEDDED-MODULE-RESET";
pub const EMBEDDED_MODULE_INPUTS: &str = "EMBEDDED-MODULE-INPUTS";
pub const EMBEDDED_MODULE_OUTPUTS: &str = "EMBEDDED-MODULE-OUTPUTS";
pub const EXT_TASK_NAME: &str = "EXT-TASK-NAME";
pub const DISTANCE: &str = "DISTANCE";
pub const LOOP_UNROLL: &str = "LOOP-UNROLL";
pub const PIPELINE: &str = "PIPELINE";

pub const DEFAULT_PLATFORM_FAMILY: &str = "generic-platform";

/// Ordered map from a key to a list of values. Typed accessors fall back
/// to a default when a key is absent or does not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceParams {
    values: LinkedHashMap<String, Vec<String>>,
}

impl ResourceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get_values(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn set_values<K: Into<String>>(&mut self, key: K, values: Vec<String>) {
        let key = key.into();
        // Keep the position of an existing key.
        if let Some(v) = self.values.get_mut(&key) {
            *v = values;
        } else {
            self.values.insert(key, values);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// Entries of `src` come first and override entries with the same key.
    pub fn merge(&mut self, src: &ResourceParams) {
        let mut merged = src.values.clone();
        for (k, v) in self.values.iter() {
            if !merged.contains_key(k) {
                merged.insert(k.clone(), v.clone());
            }
        }
        self.values = merged;
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.first(key).unwrap_or(default).to_string()
    }

    pub fn set_string<V: ToString>(&mut self, key: &str, value: V) {
        self.set_values(key, vec![value.to_string()]);
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.first(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_opt_int(&self, key: &str) -> Option<i64> {
        self.first(key).and_then(|v| v.parse().ok())
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set_string(key, value);
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.first(key) {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set_string(key, value);
    }

    /// Positive (`rst`) when true, active low (`rst_n`) otherwise.
    pub fn reset_polarity(&self) -> bool {
        self.get_bool(RESET_POLARITY, false)
    }

    pub fn has_reset_polarity(&self) -> bool {
        self.values.contains_key(RESET_POLARITY)
    }

    pub fn set_reset_polarity(&mut self, p: bool) {
        self.set_bool(RESET_POLARITY, p);
    }

    pub fn reset_name(&self) -> String {
        self.get_string(RESET_NAME, "")
    }

    pub fn set_reset_name(&mut self, name: &str) {
        self.set_string(RESET_NAME, name);
    }

    pub fn module_name_prefix(&self) -> String {
        self.get_string(MODULE_NAME_PREFIX, "")
    }

    pub fn set_module_name_prefix(&mut self, prefix: &str) {
        self.set_string(MODULE_NAME_PREFIX, prefix);
    }

    pub fn port_name_prefix(&self) -> String {
        self.get_string(PORT_NAME_PREFIX, "")
    }

    pub fn set_port_name_prefix(&mut self, prefix: &str) {
        self.set_string(PORT_NAME_PREFIX, prefix);
    }

    pub fn sram_port_index(&self) -> String {
        self.get_string(SRAM_PORT_INDEX, "")
    }

    pub fn set_sram_port_index(&mut self, idx: &str) {
        self.set_string(SRAM_PORT_INDEX, idx);
    }

    pub fn platform_family(&self) -> String {
        self.get_string(PLATFORM_FAMILY, DEFAULT_PLATFORM_FAMILY)
    }

    pub fn set_platform_family(&mut self, family: &str) {
        self.set_string(PLATFORM_FAMILY, family);
    }

    pub fn platform_name(&self) -> String {
        self.get_string(PLATFORM_NAME, "")
    }

    pub fn set_platform_name(&mut self, name: &str) {
        self.set_string(PLATFORM_NAME, name);
    }

    pub fn max_delay_ps(&self) -> i64 {
        self.get_int(MAX_DELAY_PS, 10000)
    }

    pub fn set_max_delay_ps(&mut self, ps: i64) {
        self.set_int(MAX_DELAY_PS, ps);
    }

    pub fn addr_width(&self) -> i64 {
        self.get_int(ADDR_WIDTH, 32)
    }

    pub fn set_addr_width(&mut self, width: i64) {
        self.set_int(ADDR_WIDTH, width);
    }

    pub fn set_ext_input_port(&mut self, name: &str, width: i64) {
        self.set_string(EXT_INPUT_PORT, name);
        self.set_int(WIDTH, width);
    }

    /// Port name and width of an external input, if any.
    pub fn ext_input_port(&self) -> Option<(String, i64)> {
        self.first(EXT_INPUT_PORT)
            .filter(|n| !n.is_empty())
            .map(|n| (n.to_string(), self.width()))
    }

    pub fn set_ext_output_port(&mut self, name: &str, width: i64) {
        self.set_string(EXT_OUTPUT_PORT, name);
        self.set_int(WIDTH, width);
    }

    /// Port name and width of an external output, if any.
    pub fn ext_output_port(&self) -> Option<(String, i64)> {
        self.first(EXT_OUTPUT_PORT)
            .filter(|n| !n.is_empty())
            .map(|n| (n.to_string(), self.width()))
    }

    pub fn width(&self) -> i64 {
        self.get_int(WIDTH, 0)
    }

    pub fn set_width(&mut self, width: i64) {
        self.set_int(WIDTH, width);
    }

    pub fn initial_value(&self) -> Option<i64> {
        self.get_opt_int(INITIAL_VALUE)
    }

    pub fn set_initial_value(&mut self, value: i64) {
        self.set_int(INITIAL_VALUE, value);
    }

    pub fn default_value(&self) -> Option<i64> {
        self.get_opt_int(DEFAULT_VALUE)
    }

    pub fn set_default_value(&mut self, value: i64) {
        self.set_int(DEFAULT_VALUE, value);
    }

    pub fn set_embedded_module(&mut self, module: &str, file: &str) {
        self.set_string(EMBEDDED_MODULE, module);
        self.set_string(EMBEDDED_MODULE_FILE, file);
    }

    pub fn embedded_module_name(&self) -> String {
        self.get_string(EMBEDDED_MODULE, "")
    }

    pub fn embedded_module_file(&self) -> String {
        self.get_string(EMBEDDED_MODULE_FILE, "")
    }

    pub fn embedded_module_clock(&self) -> String {
        self.get_string(EMBEDDED_MODULE_CLOCK, "clk")
    }

    pub fn embedded_module_reset(&self) -> String {
        self.get_string(EMBEDDED_MODULE_RESET, "rst")
    }

    pub fn set_embedded_module_io(&mut self, is_output: bool, ports: Vec<String>) {
        let key = if is_output {
            EMBEDDED_MODULE_OUTPUTS
        } else {
            EMBEDDED_MODULE_INPUTS
        };
        self.set_values(key, ports);
    }

    pub fn embedded_module_io(&self, is_output: bool) -> Vec<String> {
        let key = if is_output {
            EMBEDDED_MODULE_OUTPUTS
        } else {
            EMBEDDED_MODULE_INPUTS
        };
        self.get_values(key).map(<[String]>::to_vec).unwrap_or_default()
    }

    pub fn ext_task_name(&self) -> String {
        self.get_string(EXT_TASK_NAME, "")
    }

    pub fn set_ext_task_name(&mut self, name: &str) {
        self.set_string(EXT_TASK_NAME, name);
    }

    pub fn distance(&self) -> i64 {
        self.get_int(DISTANCE, 0)
    }

    pub fn set_distance(&mut self, distance: i64) {
        self.set_int(DISTANCE, distance);
    }

    pub fn loop_unroll_count(&self) -> i64 {
        self.get_int(LOOP_UNROLL, 1)
    }

    pub fn set_loop_unroll_count(&mut self, count: i64) {
        self.set_int(LOOP_UNROLL, count);
    }

    pub fn pipeline(&self) -> bool {
        self.get_bool(PIPELINE, false)
    }

    pub fn set_pipeline(&mut self, pipeline: bool) {
        self.set_bool(PIPELINE, pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = ResourceParams::new();
        assert!(!p.reset_polarity());
        assert!(!p.has_reset_polarity());
        assert_eq!(p.platform_family(), "generic-platform");
        assert_eq!(p.max_delay_ps(), 10000);
        assert_eq!(p.addr_width(), 32);
        assert_eq!(p.loop_unroll_count(), 1);
        assert_eq!(p.embedded_module_clock(), "clk");
        assert_eq!(p.embedded_module_reset(), "rst");
        assert_eq!(p.initial_value(), None);
        assert_eq!(p.ext_output_port(), None);
    }

    #[test]
    fn typed_values() {
        let mut p = ResourceParams::new();
        p.set_values(RESET_POLARITY, vec!["TRUE".to_string()]);
        assert!(p.reset_polarity());
        p.set_values(MAX_DELAY_PS, vec!["fast".to_string()]);
        assert_eq!(p.max_delay_ps(), 10000);
        p.set_ext_output_port("led", 8);
        assert_eq!(p.ext_output_port(), Some(("led".to_string(), 8)));
        p.set_initial_value(-2);
        assert_eq!(p.initial_value(), Some(-2));
    }

    #[test]
    fn merge_overrides_and_orders() {
        let mut dst = ResourceParams::new();
        dst.set_string("A", "1");
        dst.set_string("B", "2");
        let mut src = ResourceParams::new();
        src.set_string("B", "3");
        src.set_string("C", "4");
        dst.merge(&src);
        let keys: Vec<_> = dst.keys().collect();
        assert_eq!(keys, vec!["B", "C", "A"]);
        assert_eq!(dst.get_string("B", ""), "3");
        assert_eq!(dst.get_string("A", ""), "1");
    }
}
