//! Imported image assets
//!
//! The `ResourceManager` owns every imported image: decoded RGBA8 pixels plus
//! the GPU texture they were uploaded to. Stages refer to images by `ImageId`
//! and subscribe to updates so they can rebind when an image is re-imported.
//!
//! Subscriptions are tied to a `LifetimeToken` held by the subscriber. Once the
//! token is dropped the subscription is pruned on the next notification; no
//! explicit unsubscribe exists.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use image::RgbaImage;

use crate::gpu_context::GpuContext;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unknown image {0}")]
    UnknownImage(ImageId),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("image is {width}x{height}, larger than the {max}px texture limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of an imported image. Never reused within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by a manager.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> ImageId {
        let id = ImageId(self.next);
        self.next += 1;
        id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Liveness handle for a subscriber. Dropping it ends all its subscriptions.
#[derive(Debug, Default)]
pub struct LifetimeToken(Rc<()>);

impl LifetimeToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn watch(&self) -> Weak<()> {
        Rc::downgrade(&self.0)
    }
}

struct Subscription<E> {
    alive: Weak<()>,
    callback: Box<dyn FnMut(&E)>,
}

/// Observer list whose entries expire with their `LifetimeToken`.
pub struct Subscribers<E> {
    entries: Vec<Subscription<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E> Subscribers<E> {
    pub fn subscribe(&mut self, token: &LifetimeToken, callback: impl FnMut(&E) + 'static) {
        self.entries.push(Subscription {
            alive: token.watch(),
            callback: Box::new(callback),
        });
    }

    /// Drop expired subscriptions, then invoke the live ones. Returns how many ran.
    pub fn notify(&mut self, event: &E) -> usize {
        self.entries.retain(|s| s.alive.strong_count() > 0);
        for subscription in &mut self.entries {
            (subscription.callback)(event);
        }
        self.entries.len()
    }

    /// Number of registered subscriptions, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Where image data comes from.
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Pixels(RgbaImage),
}

impl ImageSource {
    fn decode(self) -> Result<RgbaImage, ResourceError> {
        let pixels = match self {
            ImageSource::Path(path) => image::open(&path)?.to_rgba8(),
            ImageSource::Bytes(bytes) => image::load_from_memory(&bytes)?.to_rgba8(),
            ImageSource::Pixels(pixels) => pixels,
        };
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ResourceError::EmptyImage);
        }
        Ok(pixels)
    }
}

/// Sent to subscribers after an image was re-uploaded.
#[derive(Clone)]
pub struct ImageUpdate {
    pub id: ImageId,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub revision: u64,
}

pub struct ImageResource {
    id: ImageId,
    name: String,
    pixels: RgbaImage,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    uploaded: bool,
    revision: u64,
    subscribers: Subscribers<ImageUpdate>,
}

impl ImageResource {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Bumped on every re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn snapshot(&self) -> ImageUpdate {
        ImageUpdate {
            id: self.id,
            view: self.view.clone(),
            width: self.width(),
            height: self.height(),
            revision: self.revision,
        }
    }

    fn upload_to_gpu(&mut self, queue: &wgpu::Queue) {
        let (width, height) = self.pixels.dimensions();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.pixels.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.uploaded = true;
    }

    fn notify_update(&mut self) -> usize {
        let update = self.snapshot();
        self.subscribers.notify(&update)
    }
}

fn create_image_texture(device: &wgpu::Device, name: &str, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(name),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCE MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ResourceManager {
    device: wgpu::Device,
    queue: wgpu::Queue,
    images: BTreeMap<ImageId, ImageResource>,
    ids: IdAllocator,
    default_sampler: wgpu::Sampler,
}

impl ResourceManager {
    pub fn new(gpu: &GpuContext) -> Self {
        let default_sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Default Image Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device: gpu.device().clone(),
            queue: gpu.queue().clone(),
            images: BTreeMap::new(),
            ids: IdAllocator::default(),
            default_sampler,
        }
    }

    /// Decode `source`, upload it, and register it under a fresh id.
    pub fn add_image(&mut self, name: impl Into<String>, source: ImageSource) -> Result<ImageId, ResourceError> {
        let name = name.into();
        let pixels = source
            .decode()
            .and_then(|pixels| self.check_fits(pixels))
            .inspect_err(|e| {
                tracing::error!("Failed to import image '{}': {}", name, e);
            })?;

        let (texture, view) = create_image_texture(&self.device, &name, pixels.width(), pixels.height());
        let id = self.ids.allocate();
        let mut image = ImageResource {
            id,
            name,
            pixels,
            texture,
            view,
            uploaded: false,
            revision: 0,
            subscribers: Subscribers::default(),
        };
        image.upload_to_gpu(&self.queue);

        tracing::info!("Imported image '{}' ({}x{}) as {}", image.name, image.width(), image.height(), id);
        self.images.insert(id, image);
        Ok(id)
    }

    /// Reject pixels the device cannot hold in one 2-D texture.
    fn check_fits(&self, pixels: RgbaImage) -> Result<RgbaImage, ResourceError> {
        let max = self.device.limits().max_texture_dimension_2d;
        let (width, height) = pixels.dimensions();
        if width > max || height > max {
            return Err(ResourceError::TooLarge { width, height, max });
        }
        Ok(pixels)
    }

    pub fn get_image(&self, id: ImageId) -> Result<&ImageResource, ResourceError> {
        self.images.get(&id).ok_or(ResourceError::UnknownImage(id))
    }

    /// Replace the pixels of an existing image and notify its subscribers.
    ///
    /// The texture is recreated when the dimensions change.
    pub fn update_image(&mut self, id: ImageId, source: ImageSource) -> Result<(), ResourceError> {
        let name = &self.get_image(id)?.name;
        let pixels = source
            .decode()
            .and_then(|pixels| self.check_fits(pixels))
            .inspect_err(|e| {
                tracing::error!("Failed to update image '{}': {}", name, e);
            })?;
        let image = self.images.get_mut(&id).ok_or(ResourceError::UnknownImage(id))?;

        if pixels.dimensions() != image.pixels.dimensions() {
            let (texture, view) = create_image_texture(&self.device, &image.name, pixels.width(), pixels.height());
            image.texture = texture;
            image.view = view;
        }
        image.pixels = pixels;
        image.uploaded = false;
        image.upload_to_gpu(&self.queue);
        image.revision += 1;

        let notified = image.notify_update();
        tracing::debug!("Updated image {} (revision {}), notified {} subscriber(s)", id, image.revision, notified);
        Ok(())
    }

    /// Call `callback` after every future update of `id`, for as long as `token` lives.
    pub fn subscribe(
        &mut self,
        id: ImageId,
        token: &LifetimeToken,
        callback: impl FnMut(&ImageUpdate) + 'static,
    ) -> Result<(), ResourceError> {
        let image = self.images.get_mut(&id).ok_or(ResourceError::UnknownImage(id))?;
        image.subscribers.subscribe(token, callback);
        Ok(())
    }

    /// Re-send the current state of `id` to its live subscribers.
    pub fn notify_update(&mut self, id: ImageId) -> Result<usize, ResourceError> {
        let image = self.images.get_mut(&id).ok_or(ResourceError::UnknownImage(id))?;
        Ok(image.notify_update())
    }

    /// Imported images in id order.
    pub fn images(&self) -> impl Iterator<Item = &ImageResource> {
        self.images.values()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Clamp-to-edge linear sampler shared by image stages.
    pub fn default_sampler(&self) -> &wgpu::Sampler {
        &self.default_sampler
    }
}

#[cfg(test)]
pub(crate) fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba(rgba))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_context::test_support;
    use std::cell::Cell;

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = IdAllocator::default();
        let a = ids.allocate();
        let b = ids.allocate();
        let c = ids.allocate();
        assert!(a < b && b < c);
        assert_eq!(a.raw(), 0);
        assert_eq!(c.to_string(), "#2");
    }

    #[test]
    fn test_independent_allocators() {
        let mut first = IdAllocator::default();
        let mut second = IdAllocator::default();
        first.allocate();
        assert_eq!(second.allocate().raw(), 0);
    }

    #[test]
    fn test_expired_subscriber_is_pruned() {
        let mut subscribers: Subscribers<u32> = Subscribers::default();
        let calls = Rc::new(Cell::new(0));

        let token = LifetimeToken::new();
        let counter = calls.clone();
        subscribers.subscribe(&token, move |_| counter.set(counter.get() + 1));

        assert_eq!(subscribers.notify(&1), 1);
        assert_eq!(calls.get(), 1);

        drop(token);
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers.notify(&2), 0);
        assert!(subscribers.is_empty());
        assert_eq!(calls.get(), 1);

        for i in 0..5 {
            assert_eq!(subscribers.notify(&i), 0);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_live_subscribers_survive_pruning() {
        let mut subscribers: Subscribers<u32> = Subscribers::default();
        let seen = Rc::new(Cell::new(0));

        let keep = LifetimeToken::new();
        let expire = LifetimeToken::new();
        let sink = seen.clone();
        subscribers.subscribe(&keep, move |v| sink.set(sink.get() + *v));
        subscribers.subscribe(&expire, |_| panic!("expired subscriber invoked"));
        drop(expire);

        assert_eq!(subscribers.notify(&10), 1);
        assert_eq!(seen.get(), 10);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = ImageSource::Bytes(vec![0, 1, 2, 3]).decode();
        assert!(matches!(result, Err(ResourceError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_empty() {
        let result = ImageSource::Pixels(RgbaImage::new(0, 0)).decode();
        assert!(matches!(result, Err(ResourceError::EmptyImage)));
    }

    #[test]
    fn test_add_and_update_image() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);

        let id = resources
            .add_image("red", ImageSource::Pixels(solid_image(2, 2, [255, 0, 0, 255])))
            .unwrap();
        let image = resources.get_image(id).unwrap();
        assert!(image.is_uploaded());
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.texture().width(), 2);

        let token = LifetimeToken::new();
        let seen = Rc::new(Cell::new((0, 0)));
        let sink = seen.clone();
        resources
            .subscribe(id, &token, move |update| sink.set((update.width, update.height)))
            .unwrap();

        resources
            .update_image(id, ImageSource::Pixels(solid_image(4, 4, [0, 0, 255, 255])))
            .unwrap();
        assert_eq!(seen.get(), (4, 4));
        let image = resources.get_image(id).unwrap();
        assert_eq!(image.revision(), 1);
        assert_eq!(image.texture().width(), 4);
    }

    #[test]
    fn test_unknown_and_failed_imports() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);

        assert!(resources.add_image("broken", ImageSource::Bytes(vec![1, 2, 3])).is_err());
        assert!(resources.is_empty());

        let id = resources
            .add_image("ok", ImageSource::Pixels(solid_image(1, 1, [0, 0, 0, 255])))
            .unwrap();
        let missing = ImageId(id.raw() + 1);
        assert!(matches!(resources.get_image(missing), Err(ResourceError::UnknownImage(_))));
        assert!(resources.notify_update(missing).is_err());
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let Some(gpu) = test_support::gpu() else { return };
        let mut resources = ResourceManager::new(&gpu);
        let max = gpu.device().limits().max_texture_dimension_2d;

        gpu.device().push_error_scope(wgpu::ErrorFilter::Validation);
        let result = resources.add_image("wide", ImageSource::Pixels(solid_image(max + 1, 1, [0, 0, 0, 255])));
        assert!(matches!(result, Err(ResourceError::TooLarge { width, max: limit, .. }) if width == max + 1 && limit == max));
        assert!(resources.is_empty());

        let id = resources
            .add_image("small", ImageSource::Pixels(solid_image(2, 2, [255, 255, 255, 255])))
            .unwrap();
        let result = resources.update_image(id, ImageSource::Pixels(solid_image(1, max + 1, [0, 0, 0, 255])));
        assert!(matches!(result, Err(ResourceError::TooLarge { .. })));
        assert!(pollster::block_on(gpu.device().pop_error_scope()).is_none());

        let image = resources.get_image(id).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.texture().width(), 2);
        assert_eq!(image.revision(), 0);
    }
}
