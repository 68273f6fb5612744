use cumulus_core::constants::NOISE_LAYER_COUNT;
use cumulus_core::math::clamp_cell_count;
use cumulus_core::{CloudError, Resolution, TextureHandle};
use cumulus_noise::{NoiseField, NoiseFieldGenerator};
use glam::Vec3;

use crate::block::ParameterBlock;
use crate::layer::NoiseLayer;
use crate::light::{DirectionalLight, LightVector};
use crate::settings::CloudSettings;

/// What part of the configuration an edit touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    /// Resolution or cell count; the noise field must be regenerated.
    Noise,
    Layer(usize),
    /// Global scroll speed of all layers.
    Scroll,
    /// Position or size of the volume.
    Volume,
    /// Density, color and scattering terms.
    Shading,
    /// Step counts and march distance.
    Quality,
    Dither,
    Light,
    RenderEnabled,
    /// The whole settings struct was replaced.
    Replaced,
    /// Out-of-range values were clamped while packaging.
    Clamped,
    /// The cached field was explicitly invalidated.
    Invalidated,
}

/// Receives a notification after every settings change.
pub trait SettingsObserver {
    fn settings_changed(&mut self, change: SettingsChange, settings: &CloudSettings);
}

impl<F: FnMut(SettingsChange, &CloudSettings)> SettingsObserver for F {
    fn settings_changed(&mut self, change: SettingsChange, settings: &CloudSettings) {
        self(change, settings)
    }
}

/// Cloud volume configuration together with the noise field generated for it.
///
/// Starts dirty. `apply_settings` regenerates the field when the noise
/// settings differ from the ones the cached field was built from, when the
/// field was invalidated, or when forced. `package_for_render` only hands
/// out a block while the cached field is current.
pub struct CloudVolumeParameters {
    settings: CloudSettings,
    sun: Option<DirectionalLight>,
    dither: Option<TextureHandle>,
    generator: NoiseFieldGenerator,
    field: Option<NoiseField>,
    /// Content hash of the noise settings `field` was generated from.
    field_hash: Option<u64>,
    invalidated: bool,
    observers: Vec<Box<dyn SettingsObserver>>,
}

impl CloudVolumeParameters {
    pub fn new(mut settings: CloudSettings, generator: NoiseFieldGenerator) -> Self {
        if settings.sanitize() {
            log::warn!("Initial cloud settings were out of range and have been clamped");
        }
        Self {
            settings,
            sun: None,
            dither: None,
            generator,
            field: None,
            field_hash: None,
            invalidated: false,
            observers: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CloudSettings {
        &self.settings
    }

    pub fn generator(&self) -> &NoiseFieldGenerator {
        &self.generator
    }

    pub fn sun(&self) -> Option<&DirectionalLight> {
        self.sun.as_ref()
    }

    pub fn subscribe(&mut self, observer: impl SettingsObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// True when the cached field no longer matches the settings.
    pub fn is_dirty(&self) -> bool {
        self.invalidated
            || self.field.is_none()
            || self.field_hash != Some(self.settings.noise.content_hash())
    }

    /// Mark the cached field stale regardless of the settings.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
        self.notify(SettingsChange::Invalidated);
    }

    /// Mutate the settings in place and notify observers.
    pub fn edit(&mut self, change: SettingsChange, f: impl FnOnce(&mut CloudSettings)) {
        f(&mut self.settings);
        self.notify(change);
    }

    pub fn replace_settings(&mut self, settings: CloudSettings) {
        self.edit(SettingsChange::Replaced, |s| *s = settings);
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.edit(SettingsChange::Noise, |s| s.noise.resolution = resolution);
    }

    /// Cell count is clamped to [1, 16] on entry.
    pub fn set_cell_count(&mut self, cell_count: u32) {
        let clamped = clamp_cell_count(cell_count);
        if clamped != cell_count {
            log::warn!("Cell count {cell_count} clamped to {clamped}");
        }
        self.edit(SettingsChange::Noise, |s| s.noise.cell_count = clamped);
    }

    /// Replace one of the noise layers. Out-of-range indices are ignored.
    pub fn set_layer(&mut self, index: usize, layer: NoiseLayer) {
        if index >= NOISE_LAYER_COUNT {
            log::warn!("Ignoring noise layer {index}: only {NOISE_LAYER_COUNT} layers exist");
            return;
        }
        self.edit(SettingsChange::Layer(index), |s| s.layers[index] = layer);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.edit(SettingsChange::Volume, |s| s.position = position);
    }

    pub fn set_volume_size(&mut self, size: Vec3) {
        self.edit(SettingsChange::Volume, |s| s.volume_size = size);
    }

    pub fn set_density_offset(&mut self, offset: f32) {
        self.edit(SettingsChange::Shading, |s| s.density_offset = offset);
    }

    pub fn set_density_multiplier(&mut self, multiplier: f32) {
        self.edit(SettingsChange::Shading, |s| s.density_multiplier = multiplier);
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.edit(SettingsChange::Scroll, |s| s.speed_multiplier = multiplier);
    }

    pub fn set_cloud_color(&mut self, color: Vec3) {
        self.edit(SettingsChange::Shading, |s| s.cloud_color = color);
    }

    pub fn set_light_absorption(&mut self, absorption: f32) {
        self.edit(SettingsChange::Shading, |s| s.light_absorption = absorption);
    }

    pub fn set_light_attenuation(&mut self, attenuation: f32) {
        self.edit(SettingsChange::Shading, |s| s.light_attenuation = attenuation);
    }

    pub fn set_scattering(&mut self, forward: f32, back: f32) {
        self.edit(SettingsChange::Shading, |s| {
            s.forward_scattering = forward;
            s.back_scattering = back;
        });
    }

    pub fn set_steps(&mut self, cloud_steps: u32, light_steps: u32) {
        self.edit(SettingsChange::Quality, |s| {
            s.cloud_steps = cloud_steps;
            s.light_steps = light_steps;
        });
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.edit(SettingsChange::Quality, |s| s.max_distance = distance);
    }

    pub fn set_dither_strength(&mut self, strength: f32) {
        self.edit(SettingsChange::Dither, |s| s.dither_strength = strength);
    }

    pub fn set_render_enabled(&mut self, enabled: bool) {
        self.edit(SettingsChange::RenderEnabled, |s| s.render_enabled = enabled);
    }

    /// Bind (or unbind) the directional light the clouds are lit by.
    pub fn bind_sun(&mut self, sun: Option<DirectionalLight>) {
        self.sun = sun;
        self.notify(SettingsChange::Light);
    }

    /// Bind (or unbind) the dither texture used to jitter ray starts.
    pub fn bind_dither(&mut self, dither: Option<TextureHandle>) {
        self.dither = dither;
        self.notify(SettingsChange::Dither);
    }

    /// Regenerate the noise field if it is stale, or unconditionally when
    /// `force` is set, and return the current field.
    ///
    /// On failure the previous field is kept and the state stays dirty.
    pub fn apply_settings(&mut self, force: bool) -> Result<NoiseField, CloudError> {
        if self.settings.noise.sanitize() {
            log::warn!(
                "Cell count clamped to {} before generation",
                self.settings.noise.cell_count
            );
        }

        if !force && !self.is_dirty() {
            if let Some(field) = &self.field {
                log::debug!("Noise field {:?} is current; skipping generation", field.key());
                return Ok(field.clone());
            }
        }

        let noise = self.settings.noise;
        let field = self.generator.generate(noise.resolution, noise.cell_count)?;
        self.field = Some(field.clone());
        self.field_hash = Some(noise.content_hash());
        self.invalidated = false;
        Ok(field)
    }

    /// Adopt a field generated earlier (for example one saved by a previous
    /// session) as the cached field, leaving the state clean.
    ///
    /// Returns false and leaves the cache untouched when the field was built
    /// from different noise settings.
    pub fn restore_field(&mut self, field: NoiseField) -> bool {
        if self.settings.noise.sanitize() {
            log::warn!(
                "Cell count clamped to {} before restoring a field",
                self.settings.noise.cell_count
            );
        }
        let key = field.key();
        let noise = self.settings.noise;
        if key.resolution != noise.resolution || key.cell_count != noise.cell_count {
            log::info!(
                "Saved field {0:?} does not match settings ({1}^3, {2} cells); not restoring",
                key,
                noise.resolution.side(),
                noise.cell_count
            );
            return false;
        }
        self.field = Some(field);
        self.field_hash = Some(noise.content_hash());
        self.invalidated = false;
        true
    }

    /// The cached field, if it is current.
    pub fn noise_field(&self) -> Option<&NoiseField> {
        self.field.as_ref().filter(|_| !self.is_dirty())
    }

    /// True when `package_for_render` would produce a block.
    pub fn ready_to_render(&self) -> bool {
        self.settings.render_enabled && self.noise_field().is_some()
    }

    /// Clamp the settings in place and snapshot everything the shader needs.
    ///
    /// Returns `None` while rendering is disabled or the field is missing or
    /// stale. Calling this twice with no edits in between yields equal blocks.
    pub fn package_for_render(&mut self) -> Option<ParameterBlock> {
        if self.settings.sanitize() {
            log::warn!("Cloud settings were out of range and have been clamped");
            self.notify(SettingsChange::Clamped);
        }

        if !self.settings.render_enabled {
            log::debug!("Cloud rendering disabled; skipping frame");
            return None;
        }
        let Some(field) = self.noise_field() else {
            log::debug!("Noise field not ready; skipping frame");
            return None;
        };

        let light = LightVector::resolve(self.sun.as_ref());
        Some(ParameterBlock::build(
            &self.settings,
            field.clone(),
            light,
            self.dither,
        ))
    }

    fn notify(&mut self, change: SettingsChange) {
        for observer in &mut self.observers {
            observer.settings_changed(change, &self.settings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_noise::{CpuWorley, DistanceRequest, WorleyCompute};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// CPU backend that counts dispatches and can be switched to fail.
    struct CountingCompute {
        inner: CpuWorley,
        calls: Rc<Cell<usize>>,
        fail: Rc<Cell<bool>>,
    }

    impl WorleyCompute for CountingCompute {
        fn label(&self) -> &str {
            "counting"
        }

        fn compute_distances(
            &mut self,
            request: &DistanceRequest<'_>,
        ) -> Result<Vec<f32>, CloudError> {
            if self.fail.get() {
                return Err(CloudError::ResourceUnavailable("test device lost".into()));
            }
            self.calls.set(self.calls.get() + 1);
            self.inner.compute_distances(request)
        }
    }

    struct Harness {
        params: CloudVolumeParameters,
        calls: Rc<Cell<usize>>,
        fail: Rc<Cell<bool>>,
    }

    fn harness(settings: CloudSettings) -> Harness {
        let calls = Rc::new(Cell::new(0));
        let fail = Rc::new(Cell::new(false));
        let compute = CountingCompute {
            inner: CpuWorley::new(),
            calls: Rc::clone(&calls),
            fail: Rc::clone(&fail),
        };
        let generator = NoiseFieldGenerator::with_seed(Box::new(compute), 42);
        Harness {
            params: CloudVolumeParameters::new(settings, generator),
            calls,
            fail,
        }
    }

    #[test]
    fn test_regenerates_once() {
        let mut h = harness(CloudSettings::default());
        assert!(h.params.is_dirty());
        assert!(!h.params.ready_to_render());

        let first = h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 1);
        assert!(!h.params.is_dirty());

        let second = h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 1);
        assert_eq!(first, second);
        assert!(h.params.ready_to_render());
    }

    #[test]
    fn test_force_regenerates() {
        let mut h = harness(CloudSettings::default());
        let first = h.params.apply_settings(false).unwrap();
        let forced = h.params.apply_settings(true).unwrap();
        assert_eq!(h.calls.get(), 2);
        assert_ne!(first.key().epoch, forced.key().epoch);
    }

    #[test]
    fn test_noise_edit_dirties() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();

        h.params.set_cell_count(3);
        assert!(h.params.is_dirty());
        assert!(h.params.package_for_render().is_none());

        let field = h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 2);
        assert_eq!(field.key().cell_count, 3);
    }

    #[test]
    fn test_edit_back_stays_clean() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();

        h.params.set_resolution(Resolution::R128);
        assert!(h.params.is_dirty());
        h.params.set_resolution(Resolution::R64);
        assert!(!h.params.is_dirty());

        h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 1);
    }

    #[test]
    fn test_render_edit_keeps_field() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.set_density_multiplier(2.0);
        h.params.set_layer(1, NoiseLayer::primary());
        assert!(!h.params.is_dirty());
        h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 1);
    }

    #[test]
    fn test_restored_field_skips_apply() {
        let mut source = harness(CloudSettings::default());
        let saved = source.params.apply_settings(false).unwrap();

        let mut h = harness(CloudSettings::default());
        assert!(h.params.restore_field(saved.clone()));
        assert!(!h.params.is_dirty());
        assert_eq!(h.params.apply_settings(false).unwrap(), saved);
        assert_eq!(h.calls.get(), 0);

        h.params.apply_settings(true).unwrap();
        assert_eq!(h.calls.get(), 1);
    }

    #[test]
    fn test_restore_rejects_other_settings() {
        let mut source = harness(CloudSettings::default());
        let saved = source.params.apply_settings(false).unwrap();

        let mut h = harness(CloudSettings::default());
        h.params.set_cell_count(4);
        assert!(!h.params.restore_field(saved));
        assert!(h.params.is_dirty());
        assert!(h.params.noise_field().is_none());
    }

    #[test]
    fn test_invalidate() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.invalidate();
        assert!(h.params.is_dirty());
        h.params.apply_settings(false).unwrap();
        assert_eq!(h.calls.get(), 2);
        assert!(!h.params.is_dirty());
    }

    #[test]
    fn test_failure_keeps_cached_field() {
        let mut h = harness(CloudSettings::default());
        let first = h.params.apply_settings(false).unwrap();

        h.params.set_cell_count(5);
        h.fail.set(true);
        let err = h.params.apply_settings(false).unwrap_err();
        assert!(matches!(err, CloudError::ResourceUnavailable(_)));
        assert!(h.params.is_dirty());
        assert!(h.params.package_for_render().is_none());

        h.params.set_cell_count(1);
        assert_eq!(h.params.noise_field(), Some(&first));
    }

    #[test]
    fn test_package_clamps() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.set_volume_size(Vec3::new(-5.0, 2.0, 3.0));
        h.params.set_density_offset(1.5);
        h.params.set_steps(200, 2);

        let block = h.params.package_for_render().unwrap();
        let settings = h.params.settings();
        assert_eq!(settings.volume_size, Vec3::new(0.01, 2.0, 3.0));
        assert_eq!(settings.density_offset, 1.0);
        assert_eq!(settings.cloud_steps, 128);
        assert_eq!(settings.light_steps, 4);
        assert_eq!(block.half_extent, Vec3::new(0.005, 1.0, 1.5));
        assert_eq!(block.cloud_steps, 128);
    }

    #[test]
    fn test_cell_count_clamped() {
        let mut h = harness(CloudSettings::default());
        h.params.set_cell_count(0);
        assert_eq!(h.params.settings().noise.cell_count, 1);
        h.params.set_cell_count(40);
        assert_eq!(h.params.settings().noise.cell_count, 16);
    }

    #[test]
    fn test_package_idempotent() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.set_light_absorption(-1.0);
        h.params.set_scattering(2.0, -0.5);

        let first = h.params.package_for_render().unwrap();
        let second = h.params.package_for_render().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_uniforms(), second.to_uniforms());
        assert_eq!(first.forward_scattering, 1.0);
        assert_eq!(first.back_scattering, 0.0);
    }

    #[test]
    fn test_package_weight_fractions() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        for (i, weight) in [1.0, 1.0, 2.0].into_iter().enumerate() {
            h.params.set_layer(
                i,
                NoiseLayer {
                    weight,
                    ..NoiseLayer::primary()
                },
            );
        }
        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.weight_fractions(), [0.25, 0.25, 0.5]);

        for i in 0..3 {
            h.params.set_layer(i, NoiseLayer::silent());
        }
        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.weight_fractions(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_set_layer_out_of_range_ignored() {
        let mut h = harness(CloudSettings::default());
        let before = h.params.settings().clone();
        h.params.set_layer(3, NoiseLayer::primary());
        assert_eq!(h.params.settings(), &before);
    }

    #[test]
    fn test_render_disabled_skips() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.set_render_enabled(false);
        assert!(!h.params.ready_to_render());
        assert!(h.params.package_for_render().is_none());
        h.params.set_render_enabled(true);
        assert!(h.params.package_for_render().is_some());
    }

    #[test]
    fn test_package_before_apply_skips() {
        let mut h = harness(CloudSettings::default());
        assert!(h.params.package_for_render().is_none());
        assert_eq!(h.calls.get(), 0);
    }

    #[test]
    fn test_sun_and_default_light() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();

        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.light_direction, Vec3::Y);
        assert_eq!(block.light_color, Vec3::ONE);

        h.params.bind_sun(Some(DirectionalLight {
            forward: Vec3::new(0.0, 0.0, 1.0),
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 4.0,
        }));
        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.light_direction, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(block.light_color, Vec3::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_dither_binding() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        h.params.bind_dither(Some(TextureHandle(3)));
        h.params.set_dither_strength(0.75);
        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.dither, Some(TextureHandle(3)));
        assert_eq!(block.to_uniforms().steps[2], 1);
    }

    #[test]
    fn test_observers_notified() {
        let mut h = harness(CloudSettings::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        h.params.subscribe(move |change: SettingsChange, settings: &CloudSettings| {
            sink.borrow_mut().push((change, settings.noise.cell_count));
        });

        h.params.set_cell_count(4);
        h.params.set_volume_size(Vec3::splat(-1.0));
        h.params.package_for_render();
        h.params.invalidate();

        assert_eq!(
            *seen.borrow(),
            vec![
                (SettingsChange::Noise, 4),
                (SettingsChange::Volume, 4),
                (SettingsChange::Clamped, 4),
                (SettingsChange::Invalidated, 4),
            ]
        );
    }

    #[test]
    fn test_nan_speed_clamped_once() {
        let mut h = harness(CloudSettings::default());
        h.params.apply_settings(false).unwrap();
        let clamped = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clamped);
        h.params.subscribe(move |change: SettingsChange, _: &CloudSettings| {
            if change == SettingsChange::Clamped {
                counter.set(counter.get() + 1);
            }
        });

        h.params.set_speed_multiplier(f32::NAN);
        let first = h.params.package_for_render().unwrap();
        let second = h.params.package_for_render().unwrap();
        let third = h.params.package_for_render().unwrap();

        assert_eq!(clamped.get(), 1);
        assert_eq!(h.params.settings().speed_multiplier, 1.0);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_block_field_matches_key() {
        let settings = CloudSettings {
            noise: crate::settings::NoiseSettings {
                resolution: Resolution::R64,
                cell_count: 2,
            },
            ..CloudSettings::default()
        };
        let mut h = harness(settings);
        let field = h.params.apply_settings(false).unwrap();
        let block = h.params.package_for_render().unwrap();
        assert_eq!(block.noise.key(), field.key());
        assert_eq!(block.noise.len(), 64 * 64 * 64);
        assert!(block.noise.values().iter().any(|&v| v == 1.0));
    }
}
