//! macOS display and cursor queries.

use crate::display::DisplayInfo;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use objc2_core_graphics::{
    CGDirectDisplayID, CGDisplayBounds, CGDisplayCopyDisplayMode, CGDisplayMode,
    CGDisplayPixelsWide, CGError, CGEvent, CGGetActiveDisplayList, CGMainDisplayID,
};

fn display_info(display_id: CGDirectDisplayID) -> DisplayInfo {
    let bounds = CGDisplayBounds(display_id);
    let width_points = bounds.size.width as f64;
    let height_points = bounds.size.height as f64;
    let width_pixels = CGDisplayPixelsWide(display_id) as f64;
    let scale_factor = if width_points > 0.0 {
        width_pixels / width_points
    } else {
        1.0
    };

    let refresh_rate = CGDisplayCopyDisplayMode(display_id).and_then(|mode| {
        let rate = CGDisplayMode::refresh_rate(Some(&mode));
        (rate > 0.0).then(|| rate.round() as u32)
    });

    DisplayInfo {
        id: display_id,
        bounds: Rect::new(
            bounds.origin.x as f64,
            bounds.origin.y as f64,
            width_points,
            height_points,
        ),
        scale_factor,
        refresh_rate,
        is_primary: display_id == CGMainDisplayID(),
    }
}

/// Active displays in CoreGraphics global coordinates (top-left origin).
pub fn displays() -> Result<Vec<DisplayInfo>> {
    let mut max_displays = 8usize;
    loop {
        let mut displays = vec![0; max_displays];
        let mut count: u32 = 0;
        let status = unsafe {
            CGGetActiveDisplayList(max_displays as u32, displays.as_mut_ptr(), &mut count)
        };
        if status != CGError::Success {
            return Err(Error::Platform(format!(
                "CGGetActiveDisplayList failed: {:?}",
                status
            )));
        }

        if (count as usize) <= max_displays {
            displays.truncate(count as usize);
            return Ok(displays.into_iter().map(display_info).collect());
        }

        max_displays = count as usize;
    }
}

/// Current cursor location, read from a null-source event.
pub fn cursor_position() -> Result<Point> {
    let event = CGEvent::new(None)
        .ok_or_else(|| Error::Platform("CGEventCreate returned null".into()))?;
    let location = CGEvent::location(Some(&event));
    Ok(Point::new(location.x as f64, location.y as f64))
}
