//! FreeDesktop.org desktop entry generation.

/// Fields of the generated desktop entry.
#[derive(Debug, Clone)]
pub struct DesktopEntry<'a> {
    /// Display name
    pub name: &'a str,
    /// Comment line shown by launchers
    pub comment: &'a str,
    /// Icon name (no extension)
    pub icon: &'a str,
    /// Semicolon-terminated category list
    pub categories: &'a str,
    /// X11 window class the runtime reports, for taskbar grouping
    pub wm_class: &'a str,
}

/// Render a desktop entry for the AppDir.
///
/// `Exec=AppRun` is the AppImage convention; appimagetool rewrites it
/// on integration.
pub fn render_desktop_entry(entry: &DesktopEntry<'_>) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={name}\n\
         Comment={comment}\n\
         Exec=AppRun %u\n\
         Icon={icon}\n\
         Categories={categories}\n\
         StartupWMClass={wm_class}\n\
         Terminal=false\n",
        name = entry.name,
        comment = entry.comment,
        icon = entry.icon,
        categories = entry.categories,
        wm_class = entry.wm_class,
    )
}
