//! List connected displays in hook space and in virtual-desktop space.
//!
//! Run with: cargo run --example display

use limelight::coords::{hook_rect_to_virtual_desktop, hook_to_virtual_desktop};
use limelight::{cursor_position, displays};

fn main() -> limelight::Result<()> {
    let all = displays()?;
    let Some(primary) = all.first() else {
        println!("No displays found");
        return Ok(());
    };
    let primary_height = primary.bounds.height;

    println!("Displays ({}), primary height {primary_height}", all.len());
    for (index, display) in all.iter().enumerate() {
        let b = display.bounds;
        let v = hook_rect_to_virtual_desktop(b, primary_height);
        println!(
            "  [{index}] id={} scale={:.2} refresh={:?}{}",
            display.id,
            display.scale_factor,
            display.refresh_rate,
            if display.is_primary { " (primary)" } else { "" }
        );
        println!(
            "      hook:    ({:.0}, {:.0}) {:.0}x{:.0}",
            b.x, b.y, b.width, b.height
        );
        println!(
            "      desktop: ({:.0}, {:.0}) {:.0}x{:.0}",
            v.x, v.y, v.width, v.height
        );
    }

    let cursor = cursor_position()?;
    let desktop = hook_to_virtual_desktop(cursor, primary_height);
    println!(
        "Cursor: hook ({:.0}, {:.0}) -> desktop ({:.0}, {:.0})",
        cursor.x, cursor.y, desktop.x, desktop.y
    );

    Ok(())
}
