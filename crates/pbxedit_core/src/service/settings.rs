//! Build-setting edits across `XCBuildConfiguration` records.
//!
//! # Responsibility
//! - Write, update and remove per-configuration build settings.
//! - Maintain list-valued settings (search paths, linker flags) for the
//!   configurations building one product.
//!
//! # Invariants
//! - List settings written here always start with `$(inherited)` and hold
//!   each entry at most once.
//! - Product-name comparisons ignore surrounding quotes.

use crate::model::document::{Record, SectionKind};
use crate::model::value::{unquote, Dict, ObjectId, Value};
use crate::service::{Project, ProjectResult};
use log::debug;

const INHERITED: &str = "$(inherited)";
const OTHER_LDFLAGS: &str = "OTHER_LDFLAGS";

impl Project {
    /// Sets `key` on every configuration named `configuration` (all when
    /// `None`) whose `PRODUCT_NAME` is `product_name` (any when `None`).
    pub fn add_build_property(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        configuration: Option<&str>,
        product_name: Option<&str>,
    ) {
        let value = value.into();
        let mut touched = 0usize;
        for record in self.configurations_mut() {
            let name_matches = configuration.map_or(true, |name| name_is(record, name));
            let product_matches =
                product_name.map_or(true, |product| product_name_is(record, product));
            if name_matches && product_matches {
                record.fields.entry_dict("buildSettings").insert(key, value.clone());
                touched += 1;
            }
        }
        debug!("event=build_property_add module=service status=ok key={key} configurations={touched}");
    }

    /// Removes `key` from every configuration holding it when
    /// `configuration` is `None`, else from the configurations so named.
    pub fn remove_build_property(&mut self, key: &str, configuration: Option<&str>) {
        for record in self.configurations_mut() {
            let doomed = match configuration {
                None => settings_of(record).is_some_and(|settings| settings.contains_key(key)),
                Some(name) => name_is(record, name),
            };
            if doomed {
                if let Some(settings) = record.fields.get_dict_mut("buildSettings") {
                    settings.remove(key);
                }
            }
        }
    }

    /// Sets `key` on every configuration named `configuration`, or on all
    /// configurations when `None`.
    pub fn update_build_property(&mut self, key: &str, value: impl Into<Value>, configuration: Option<&str>) {
        self.add_build_property(key, value, configuration, None);
    }

    pub fn update_product_name(&mut self, name: &str) {
        self.update_build_property("PRODUCT_NAME", name, None);
    }

    /// Value of `key` in the last configuration named `configuration` (any
    /// when `None`) that defines it.
    pub fn get_build_property(&self, key: &str, configuration: Option<&str>) -> Option<&Value> {
        self.document
            .records(SectionKind::BuildConfiguration)
            .filter(|record| configuration.map_or(true, |name| name_is(record, name)))
            .filter_map(|record| settings_of(record)?.get(key))
            .last()
    }

    /// Every configuration whose `name` is `name`.
    pub fn get_build_config_by_name(&self, name: &str) -> Vec<&Record> {
        self.document
            .records(SectionKind::BuildConfiguration)
            .filter(|record| name_is(record, name))
            .collect()
    }

    /// Sets `key` on the configurations of `target`, or on every
    /// configuration when `None`.
    ///
    /// # Errors
    /// - [`crate::service::ProjectError::TargetNotFound`] for an unknown `target`.
    pub fn add_to_build_settings(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        target: Option<&str>,
    ) -> ProjectResult<()> {
        let scope: Option<Vec<ObjectId>> = match target {
            Some(target) => {
                let target = self.require_target(target)?;
                Some(self.document.configuration_ids_for_target(target.as_str()))
            }
            None => None,
        };
        let value = value.into();
        for record in self.configurations_mut() {
            if scope.as_ref().map_or(true, |ids| ids.contains(&record.id)) {
                record.fields.entry_dict("buildSettings").insert(key, value.clone());
            }
        }
        debug!("event=build_setting_add module=service status=ok key={key}");
        Ok(())
    }

    /// Removes `key` from every configuration.
    pub fn remove_from_build_settings(&mut self, key: &str) {
        for record in self.configurations_mut() {
            if let Some(settings) = record.fields.get_dict_mut("buildSettings") {
                settings.remove(key);
            }
        }
    }

    pub fn add_to_other_linker_flags(&mut self, flag: &str) {
        self.append_to_list_setting(OTHER_LDFLAGS, flag, None);
    }

    /// Removes every `OTHER_LDFLAGS` entry containing `flag`.
    pub fn remove_from_other_linker_flags(&mut self, flag: &str) {
        self.remove_from_list_setting(OTHER_LDFLAGS, flag);
    }

    /// Appends `entry` to the list setting `key` of each configuration
    /// building `product_name`, or the inferred product when `None`.
    pub(crate) fn append_to_list_setting(&mut self, key: &str, entry: &str, product_name: Option<&str>) {
        let Some(product) = product_name
            .map(|name| unquote(name).to_string())
            .or_else(|| self.document.product_name())
        else {
            debug!("event=list_setting_add module=service status=skipped key={key} reason=no_product_name");
            return;
        };

        for record in self.configurations_mut() {
            if !product_name_is(record, &product) {
                continue;
            }
            let settings = record.fields.entry_dict("buildSettings");
            match settings.get_mut(key) {
                Some(Value::Array(items)) => push_unique(items, entry),
                Some(value) => {
                    let mut items = if value.is_str(INHERITED) {
                        vec![Value::from(INHERITED)]
                    } else {
                        vec![value.clone()]
                    };
                    push_unique(&mut items, entry);
                    *value = Value::Array(items);
                }
                None => {
                    settings.insert(key, vec![Value::from(INHERITED), Value::from(entry)]);
                }
            }
        }
    }

    /// Drops entries of the list setting `key` containing `needle` from the
    /// configurations building the inferred product. A scalar setting
    /// containing `needle` is removed outright.
    pub(crate) fn remove_from_list_setting(&mut self, key: &str, needle: &str) {
        let Some(product) = self.document.product_name() else {
            return;
        };
        for record in self.configurations_mut() {
            if !product_name_is(record, &product) {
                continue;
            }
            let Some(settings) = record.fields.get_dict_mut("buildSettings") else {
                continue;
            };
            let scalar_match = match settings.get_mut(key) {
                Some(Value::Array(items)) => {
                    items.retain(|item| !item.as_str().is_some_and(|text| text.contains(needle)));
                    false
                }
                Some(value) => value.as_str().is_some_and(|text| text.contains(needle)),
                None => false,
            };
            if scalar_match {
                settings.remove(key);
            }
        }
    }

    fn configurations_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.document
            .section_mut(SectionKind::BuildConfiguration)
            .into_iter()
            .flat_map(|section| section.records_mut())
    }
}

fn push_unique(items: &mut Vec<Value>, entry: &str) {
    if !items.iter().any(|item| item.is_str(entry)) {
        items.push(Value::from(entry));
    }
}

fn settings_of(record: &Record) -> Option<&Dict> {
    record.fields.get_dict("buildSettings")
}

fn name_is(record: &Record, name: &str) -> bool {
    record.fields.get("name").is_some_and(|value| value.is_str(name))
}

fn product_name_is(record: &Record, product: &str) -> bool {
    settings_of(record)
        .and_then(|settings| settings.get("PRODUCT_NAME"))
        .is_some_and(|value| value.is_str(product))
}
