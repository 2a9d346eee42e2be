//! iOS frame grabber using AVFoundation
//!
//! Grabs a frame with `AVAssetImageGenerator`, optionally draws the frame
//! time onto it with UIKit, encodes it as JPEG or PNG and writes it to the
//! app's Documents directory.

use super::native::NativeCompletion;
use super::request::{discard_output, file_uri, FrameRequest, SnapshotFormat};
use super::traits::{NativeBinding, SnapshotOptions};
use anyhow::{anyhow, bail, Context};
use objc2::encode::{Encode, Encoding, RefEncode};
use objc2::rc::{autoreleasepool, Id};
use objc2::runtime::{AnyObject, Bool};
use objc2::{class, msg_send, msg_send_id};
use objc2_foundation::{CGFloat, CGPoint, CGRect, CGSize, NSString};
use std::path::{Path, PathBuf};

const NS_DOCUMENT_DIRECTORY: usize = 9;
const NS_USER_DOMAIN_MASK: usize = 1;

/// CoreMedia `CMTime`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
struct CMTime {
    value: i64,
    timescale: i32,
    flags: u32,
    epoch: i64,
}

impl CMTime {
    const TIMESCALE: i32 = 600;
    const FLAG_VALID: u32 = 1;

    const ZERO: CMTime = CMTime {
        value: 0,
        timescale: 1,
        flags: Self::FLAG_VALID,
        epoch: 0,
    };

    fn from_seconds(secs: f64) -> Self {
        CMTime {
            value: (secs * Self::TIMESCALE as f64).round() as i64,
            timescale: Self::TIMESCALE,
            flags: Self::FLAG_VALID,
            epoch: 0,
        }
    }
}

unsafe impl Encode for CMTime {
    const ENCODING: Encoding = Encoding::Struct(
        "?",
        &[i64::ENCODING, i32::ENCODING, u32::ENCODING, i64::ENCODING],
    );
}

unsafe impl RefEncode for CMTime {
    const ENCODING_REF: Encoding = Encoding::Pointer(&Self::ENCODING);
}

/// Opaque `CGImage`
#[repr(C)]
struct CGImage {
    _private: [u8; 0],
}

unsafe impl RefEncode for CGImage {
    const ENCODING_REF: Encoding = Encoding::Pointer(&Encoding::Struct("CGImage", &[]));
}

#[link(name = "AVFoundation", kind = "framework")]
#[link(name = "CoreMedia", kind = "framework")]
extern "C" {}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGImageRelease(image: *mut CGImage);
}

#[link(name = "UIKit", kind = "framework")]
extern "C" {
    fn UIImageJPEGRepresentation(image: &AnyObject, quality: CGFloat) -> *mut AnyObject;
    fn UIImagePNGRepresentation(image: &AnyObject) -> *mut AnyObject;
    fn UIGraphicsBeginImageContextWithOptions(size: CGSize, opaque: Bool, scale: CGFloat);
    fn UIGraphicsGetImageFromCurrentImageContext() -> *mut AnyObject;
    fn UIGraphicsEndImageContext();

    static NSFontAttributeName: &'static NSString;
    static NSForegroundColorAttributeName: &'static NSString;
}

/// Native binding backed by AVFoundation
pub struct AvFoundationFrameGrabber {
    output_dir: Option<PathBuf>,
}

impl AvFoundationFrameGrabber {
    /// `output_dir` of `None` writes to the app's Documents directory
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }
}

impl NativeBinding for AvFoundationFrameGrabber {
    fn capture(&self, options: SnapshotOptions, completion: NativeCompletion) {
        let request = match FrameRequest::from_options(&options) {
            Ok(request) => request,
            Err(e) => {
                completion.fail(format!("{:#}", e));
                return;
            }
        };

        let default_dir = self.output_dir.clone();

        tokio::spawn(async move {
            // AVAssetImageGenerator blocks until the frame is decoded.
            let grab = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
                let dir = match default_dir {
                    Some(dir) => dir,
                    None => documents_directory()?,
                };
                let output = request.output_path(&dir);
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create output directory {:?}", parent))?;
                }

                write_frame(&request, &output)?;
                Ok(output)
            });

            let outcome = match grab.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!("frame grab task failed: {}", e)),
            };

            match outcome {
                Ok(path) if completion.is_closed() => {
                    tracing::warn!("Snapshot abandoned by caller; discarding {:?}", path);
                    discard_output(&path).await;
                }
                Ok(path) => {
                    tracing::info!("Snapshot written to {:?}", path);
                    completion.succeed(file_uri(&path));
                }
                Err(e) => completion.fail(format!("{:#}", e)),
            }
        });
    }
}

/// The app's Documents directory
fn documents_directory() -> anyhow::Result<PathBuf> {
    autoreleasepool(|_| unsafe {
        let manager: Id<AnyObject> = msg_send_id![class!(NSFileManager), defaultManager];
        let urls: Id<AnyObject> = msg_send_id![
            &manager,
            URLsForDirectory: NS_DOCUMENT_DIRECTORY,
            inDomains: NS_USER_DOMAIN_MASK
        ];
        let url: Option<Id<AnyObject>> = msg_send_id![&urls, lastObject];
        let url = url.ok_or_else(|| anyhow!("no Documents directory available"))?;

        let path: Option<Id<NSString>> = msg_send_id![&url, path];
        path.map(|p| PathBuf::from(p.to_string()))
            .ok_or_else(|| anyhow!("Documents directory has no file path"))
    })
}

fn write_frame(request: &FrameRequest, output: &Path) -> anyhow::Result<()> {
    autoreleasepool(|_| unsafe {
        let source = NSString::from_str(&request.source.to_string_lossy());
        let url: Id<AnyObject> = msg_send_id![class!(NSURL), fileURLWithPath: &*source];
        let asset: Id<AnyObject> = msg_send_id![
            class!(AVURLAsset),
            URLAssetWithURL: &*url,
            options: None::<&AnyObject>
        ];
        let generator: Id<AnyObject> =
            msg_send_id![class!(AVAssetImageGenerator), assetImageGeneratorWithAsset: &*asset];

        let _: () = msg_send![&generator, setAppliesPreferredTrackTransform: Bool::YES];
        let _: () = msg_send![&generator, setRequestedTimeToleranceBefore: CMTime::ZERO];
        let _: () = msg_send![&generator, setRequestedTimeToleranceAfter: CMTime::ZERO];

        if request.width.is_some() || request.height.is_some() {
            // Zero leaves that side unconstrained.
            let size = CGSize::new(
                request.width.unwrap_or(0) as CGFloat,
                request.height.unwrap_or(0) as CGFloat,
            );
            let _: () = msg_send![&generator, setMaximumSize: size];
        }

        let mut error: *mut AnyObject = std::ptr::null_mut();
        let cg_image: *mut CGImage = msg_send![
            &generator,
            copyCGImageAtTime: CMTime::from_seconds(request.time_secs),
            actualTime: std::ptr::null_mut::<CMTime>(),
            error: &mut error as *mut *mut AnyObject
        ];
        if cg_image.is_null() {
            let detail = describe_error(error).unwrap_or_else(|| "no frame at requested time".to_string());
            bail!("{}", detail);
        }

        let image: Id<AnyObject> = msg_send_id![class!(UIImage), imageWithCGImage: cg_image];
        CGImageRelease(cg_image);

        let image = match (&request.timestamp, request.label_text()) {
            (Some(label), Some(text)) => draw_label(&image, &text, label.text_size)?,
            _ => image,
        };

        let data = match request.format {
            SnapshotFormat::Jpg => UIImageJPEGRepresentation(&image, request.quality as CGFloat),
            SnapshotFormat::Png => UIImagePNGRepresentation(&image),
        };
        if data.is_null() {
            bail!("failed to encode snapshot as {}", request.format.extension());
        }

        let path = NSString::from_str(&output.to_string_lossy());
        let written: Bool = msg_send![data, writeToFile: &*path, atomically: Bool::YES];
        if !written.as_bool() {
            bail!("failed to write snapshot to {:?}", output);
        }

        Ok(())
    })
}

/// Draw `text` in the bottom-left corner of `image`
unsafe fn draw_label(image: &AnyObject, text: &str, text_size: u64) -> anyhow::Result<Id<AnyObject>> {
    let size: CGSize = msg_send![image, size];
    let scale: CGFloat = msg_send![image, scale];
    let font_size = text_size as CGFloat;

    UIGraphicsBeginImageContextWithOptions(size, Bool::NO, scale);
    let _: () = msg_send![image, drawInRect: CGRect::new(CGPoint::new(0.0, 0.0), size)];

    let font: Id<AnyObject> = msg_send_id![class!(UIFont), systemFontOfSize: font_size];
    let color: Id<AnyObject> = msg_send_id![class!(UIColor), whiteColor];
    let attributes: Id<AnyObject> = msg_send_id![class!(NSMutableDictionary), dictionary];
    let _: () = msg_send![&attributes, setObject: &*font, forKey: NSFontAttributeName];
    let _: () = msg_send![&attributes, setObject: &*color, forKey: NSForegroundColorAttributeName];

    let label = NSString::from_str(text);
    let origin = CGPoint::new(10.0, size.height - font_size - 10.0);
    let _: () = msg_send![&label, drawAtPoint: origin, withAttributes: &*attributes];

    let labelled = UIGraphicsGetImageFromCurrentImageContext();
    UIGraphicsEndImageContext();

    Id::retain(labelled).ok_or_else(|| anyhow!("failed to draw timestamp label"))
}

unsafe fn describe_error(error: *mut AnyObject) -> Option<String> {
    if error.is_null() {
        return None;
    }
    let error: &AnyObject = &*error;
    let description: Option<Id<NSString>> = msg_send_id![error, localizedDescription];
    description.map(|d| d.to_string())
}
