//! AppRun launcher script generation.
//!
//! The launcher is the bundle's entry point. It resolves its own
//! location, picks windowing-backend flags (Wayland gets the ozone
//! platform hint and IME support), honors software-rendering requests,
//! and execs the embedded runtime against the resource container.

/// Relative path of the runtime binary inside the AppDir.
pub const RUNTIME_BIN: &str = "usr/lib/runtime/electron";

/// Relative path of the resource container inside the AppDir.
pub const RESOURCES: &str = "usr/lib/runtime/resources/app.asar";

/// Render the launcher script.
pub fn render_launcher() -> String {
    format!(
        r#"#!/bin/bash
set -u
HERE="$(dirname "$(readlink -f "${{0}}")")"

FLAGS=()
if [ -n "${{WAYLAND_DISPLAY:-}}" ]; then
    FLAGS+=(--ozone-platform-hint=auto --enable-wayland-ime)
fi
if [ -n "${{LIBGL_ALWAYS_SOFTWARE:-}}" ] || [ -n "${{APPIMAGE_DISABLE_GPU:-}}" ]; then
    FLAGS+=(--disable-gpu --disable-software-rasterizer)
fi

exec "$HERE/{runtime}" "$HERE/{resources}" "${{FLAGS[@]}}" "$@"
"#,
        runtime = RUNTIME_BIN,
        resources = RESOURCES,
    )
}
