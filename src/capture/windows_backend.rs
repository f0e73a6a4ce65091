//! Windows platform backend
//!
//! Implements every capability trait on top of Win32:
//!
//! - **Monitors**: `EnumDisplayMonitors` / `GetMonitorInfoW`
//! - **Screen copy**: `BitBlt` with `CAPTUREBLT` from the desktop DC into a
//!   top-down 32-bit DIB section
//! - **Window print**: `PrintWindow` with `PW_RENDERFULLCONTENT`
//! - **Compositor**: Windows Graphics Capture via the windows-capture crate,
//!   one frame per call
//! - **Pointer**: `GetCursorInfo` / `GetIconInfo` / `DrawIconEx`
//! - **Windows and processes**: restore, foreground, DPI, image name,
//!   product name and loaded modules
//!
//! Device contexts, bitmaps and process handles are owned by small RAII
//! guards and never outlive the call that created them.
//!
//! # Windows Version Requirements
//!
//! Windows Graphics Capture requires Windows 10 version 1803 or later;
//! `GetDpiForWindow` requires version 1607. Everything else works on all
//! supported versions.

use std::{
    ffi::{OsString, c_void},
    mem::{size_of, zeroed},
    os::windows::ffi::OsStringExt,
    path::Path,
    ptr::{null, null_mut},
    sync::{Arc, Mutex, PoisonError, mpsc},
    time::Duration,
};

use image::{RgbImage, RgbaImage};
use windows_capture::{
    capture::{Context, GraphicsCaptureApiHandler},
    frame::Frame,
    graphics_capture_api::InternalCaptureControl,
    settings::{
        ColorFormat, CursorCaptureSettings, DirtyRegionSettings, DrawBorderSettings,
        MinimumUpdateIntervalSettings, SecondaryWindowSettings, Settings,
    },
    window::Window as WcWindow,
};
use windows_sys::Win32::{
    Foundation::{CloseHandle, GetLastError, HANDLE, HWND, LPARAM, POINT, RECT},
    Graphics::{
        Dwm::{DWMWA_EXTENDED_FRAME_BOUNDS, DwmGetWindowAttribute, DwmIsCompositionEnabled},
        Gdi::{
            BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CAPTUREBLT, ClientToScreen,
            CreateCompatibleDC, CreateDIBSection, DIB_RGB_COLORS, DeleteDC, DeleteObject,
            EnumDisplayMonitors, GetDC, GetMonitorInfoW, HBITMAP, HDC, HGDIOBJ, HMONITOR,
            MONITORINFO, MONITORINFOEXW, ReleaseDC, SRCCOPY, SelectObject,
        },
    },
    Storage::{
        FileSystem::{GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW},
        Xps::PrintWindow,
    },
    System::{
        ProcessStatus::{EmptyWorkingSet, EnumProcessModules, GetModuleBaseNameW},
        Threading::{
            GetCurrentProcess, OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_INFORMATION,
            PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ, QueryFullProcessImageNameW,
        },
    },
    UI::{
        HiDpi::{GetDpiForSystem, GetDpiForWindow},
        WindowsAndMessaging::{
            CURSOR_SHOWING, CURSORINFO, DI_NORMAL, DrawIconEx, GetClassNameW, GetClientRect,
            GetCursorInfo, GetForegroundWindow, GetIconInfo, GetSystemMetrics, GetWindowRect,
            GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, ICONINFO, IsIconic,
            IsWindow, IsWindowVisible, IsZoomed, SM_CXCURSOR, SM_CYCURSOR, SW_RESTORE,
            SetForegroundWindow, ShowWindow,
        },
    },
};

use super::{
    CompositorSource, CursorSource, DesktopBlitter, DisplayEnumerator, ImageBuffer,
    ProcessInspector, WindowOperations, WindowRenderer, constants::compositor_frame_timeout_ms,
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::{CursorSnapshot, DisplayInfo, Point, ProcessInfo, Rect, WindowHandle, WindowTarget},
};

type BOOL = i32;

const TRUE: BOOL = 1;

/// Render the window including DirectComposition / hardware-accelerated
/// content
const PW_RENDERFULLCONTENT: u32 = 0x0000_0002;

/// Class names of windows hosted by the modern app shell
const MODERN_APP_CLASSES: &[&str] = &["ApplicationFrameWindow", "Windows.UI.Core.CoreWindow"];

const MONITORINFOF_PRIMARY: u32 = 1;

/// Windows platform backend
///
/// Stateless; every call queries the system afresh. Share it through `Arc`
/// and hand it to
/// [`platform_from_windows`](super::composite::platform_from_windows).
#[derive(Debug)]
pub struct WindowsBackend {
    _private: (),
}

impl WindowsBackend {
    pub fn new() -> CaptureResult<Self> {
        Ok(Self { _private: () })
    }
}

// ============================================================================
// RAII guards
// ============================================================================

/// Device context of the whole virtual desktop
struct DesktopDc(HDC);

impl DesktopDc {
    fn acquire(rect: Rect) -> CaptureResult<Self> {
        let dc = unsafe { GetDC(null_mut()) };
        if dc.is_null() {
            return Err(last_error("GetDC", rect, true));
        }
        Ok(Self(dc))
    }
}

impl Drop for DesktopDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(null_mut(), self.0);
        }
    }
}

struct MemoryDc(HDC);

impl MemoryDc {
    fn compatible_with(dc: HDC, rect: Rect) -> CaptureResult<Self> {
        let memory = unsafe { CreateCompatibleDC(dc) };
        if memory.is_null() {
            return Err(last_error("CreateCompatibleDC", rect, true));
        }
        Ok(Self(memory))
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            DeleteDC(self.0);
        }
    }
}

/// Top-down 32-bit BGRA DIB section
struct DibSection {
    bitmap: HBITMAP,
    bits:   *mut u8,
    width:  u32,
    height: u32,
}

impl DibSection {
    fn new(dc: HDC, width: u32, height: u32, rect: Rect) -> CaptureResult<Self> {
        let mut info: BITMAPINFO = unsafe { zeroed() };
        info.bmiHeader = BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB,
            ..unsafe { zeroed() }
        };

        let mut bits: *mut c_void = null_mut();
        let bitmap = unsafe { CreateDIBSection(dc, &info, DIB_RGB_COLORS, &mut bits, null_mut(), 0) };
        if bitmap.is_null() || bits.is_null() {
            return Err(last_error("CreateDIBSection", rect, true));
        }
        Ok(Self {
            bitmap,
            bits: bits.cast(),
            width,
            height,
        })
    }

    fn bgra(&self) -> &[u8] {
        let len = self.width as usize * self.height as usize * 4;
        unsafe { std::slice::from_raw_parts(self.bits, len) }
    }

    fn to_rgb(&self) -> RgbImage {
        let data = self
            .bgra()
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    fn to_rgba(&self) -> RgbaImage {
        let data = self
            .bgra()
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect();
        RgbaImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

impl Drop for DibSection {
    fn drop(&mut self) {
        unsafe {
            DeleteObject(self.bitmap);
        }
    }
}

/// Selects an object into a DC and restores the previous one on drop
struct Selection {
    dc:       HDC,
    previous: HGDIOBJ,
}

impl Selection {
    fn new(dc: HDC, object: HGDIOBJ) -> Self {
        let previous = unsafe { SelectObject(dc, object) };
        Self { dc, previous }
    }
}

impl Drop for Selection {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc, self.previous);
        }
    }
}

struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(pid: u32, access: u32) -> Option<Self> {
        let handle = unsafe { OpenProcess(access, 0, pid) };
        (!handle.is_null()).then_some(Self(handle))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn last_error(operation: &str, rect: Rect, transient: bool) -> CaptureError {
    let code = unsafe { GetLastError() };
    CaptureError::platform(operation, rect, format!("Win32 error {code}"), transient)
}

fn hwnd(handle: WindowHandle) -> HWND {
    handle.raw() as usize as HWND
}

fn rect_from_win32(rect: &RECT) -> Rect {
    Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom)
}

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    OsString::from_wide(buffer).to_string_lossy().into_owned()
}

/// Renders `width` x `height` pixels into a fresh DIB via `draw`
///
/// `draw` receives the memory DC and returns false on failure.
fn render<F>(width: u32, height: u32, rect: Rect, draw: F) -> CaptureResult<Option<DibSectionImage>>
where
    F: FnOnce(HDC) -> bool,
{
    let desktop = DesktopDc::acquire(rect)?;
    let memory = MemoryDc::compatible_with(desktop.0, rect)?;
    let dib = DibSection::new(desktop.0, width, height, rect)?;
    let selection = Selection::new(memory.0, dib.bitmap);

    if !draw(memory.0) {
        return Ok(None);
    }
    drop(selection);

    Ok(Some(DibSectionImage {
        rgb:  dib.to_rgb(),
        rgba: dib.to_rgba(),
    }))
}

/// Pixels read back from a DIB, in both layouts
struct DibSectionImage {
    rgb:  RgbImage,
    rgba: RgbaImage,
}

fn window_text(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buffer = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32);
        buffer.truncate(copied.max(0) as usize);
        from_wide(&buffer)
    }
}

fn window_class(hwnd: HWND) -> String {
    unsafe {
        let mut buffer = vec![0u16; 256];
        let len = GetClassNameW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32);
        buffer.truncate(len.max(0) as usize);
        from_wide(&buffer)
    }
}

/// Raw window rectangle, including the invisible resize borders
fn raw_window_rect(hwnd: HWND) -> Option<Rect> {
    let mut rect: RECT = unsafe { zeroed() };
    (unsafe { GetWindowRect(hwnd, &mut rect) } != 0).then(|| rect_from_win32(&rect))
}

/// Visible window rectangle, without the invisible resize borders
fn visible_window_rect(hwnd: HWND) -> Option<Rect> {
    let mut rect: RECT = unsafe { zeroed() };
    let hr = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS,
            (&mut rect as *mut RECT).cast(),
            size_of::<RECT>() as u32,
        )
    };
    if hr >= 0 {
        Some(rect_from_win32(&rect))
    } else {
        raw_window_rect(hwnd)
    }
}

fn client_rect(hwnd: HWND) -> Rect {
    let mut rect: RECT = unsafe { zeroed() };
    let mut origin = POINT { x: 0, y: 0 };
    unsafe {
        if GetClientRect(hwnd, &mut rect) == 0 || ClientToScreen(hwnd, &mut origin) == 0 {
            return Rect::default();
        }
    }
    Rect::new(
        origin.x,
        origin.y,
        (rect.right - rect.left).max(0) as u32,
        (rect.bottom - rect.top).max(0) as u32,
    )
}

/// Crops a surface rendered at `rendered` down to `bounds`
fn crop_to_bounds(surface: ImageBuffer, rendered: Rect, bounds: Rect) -> Option<ImageBuffer> {
    if rendered == bounds {
        return Some(surface);
    }
    surface.crop(bounds.relative_to(rendered.origin())).ok()
}

fn image_path(process: &ProcessHandle) -> Option<String> {
    let mut buffer = vec![0u16; 1024];
    let mut size = buffer.len() as u32;
    let ok = unsafe {
        QueryFullProcessImageNameW(process.0, PROCESS_NAME_WIN32, buffer.as_mut_ptr(), &mut size)
    };
    if ok == 0 {
        return None;
    }
    buffer.truncate(size as usize);
    Some(from_wide(&buffer))
}

fn loaded_modules(process: &ProcessHandle) -> Vec<String> {
    let mut modules = vec![null_mut::<c_void>(); 1024];
    let mut needed = 0u32;
    let ok = unsafe {
        EnumProcessModules(
            process.0,
            modules.as_mut_ptr().cast(),
            (modules.len() * size_of::<*mut c_void>()) as u32,
            &mut needed,
        )
    };
    if ok == 0 {
        return Vec::new();
    }

    let count = (needed as usize / size_of::<*mut c_void>()).min(modules.len());
    modules[..count]
        .iter()
        .filter_map(|module| {
            let mut name = vec![0u16; 260];
            let len = unsafe {
                GetModuleBaseNameW(process.0, (*module).cast(), name.as_mut_ptr(), name.len() as u32)
            };
            (len > 0).then(|| from_wide(&name[..len as usize]))
        })
        .collect()
}

/// `ProductName` from the executable's version resource
fn product_name(path: &str) -> Option<String> {
    let path = wide(path);
    let mut ignored = 0u32;
    let size = unsafe { GetFileVersionInfoSizeW(path.as_ptr(), &mut ignored) };
    if size == 0 {
        return None;
    }

    let mut data = vec![0u8; size as usize];
    if unsafe { GetFileVersionInfoW(path.as_ptr(), 0, size, data.as_mut_ptr().cast()) } == 0 {
        return None;
    }

    let query = |sub_block: &str| -> Option<(*mut c_void, u32)> {
        let sub_block = wide(sub_block);
        let mut value: *mut c_void = null_mut();
        let mut len = 0u32;
        let ok = unsafe { VerQueryValueW(data.as_ptr().cast(), sub_block.as_ptr(), &mut value, &mut len) };
        (ok != 0 && !value.is_null() && len > 0).then_some((value, len))
    };

    let (translation, _) = query(r"\VarFileInfo\Translation")?;
    let (language, codepage) = unsafe {
        let words = translation.cast::<u16>();
        (*words, *words.add(1))
    };
    let (value, len) = query(&format!(r"\StringFileInfo\{language:04x}{codepage:04x}\ProductName"))?;
    let chars = unsafe { std::slice::from_raw_parts(value.cast::<u16>(), len as usize) };
    let name = from_wide(chars).trim_end_matches('\0').trim().to_string();
    (!name.is_empty()).then_some(name)
}

// ============================================================================
// Capability implementations
// ============================================================================

impl DisplayEnumerator for WindowsBackend {
    fn displays(&self) -> CaptureResult<Vec<DisplayInfo>> {
        unsafe extern "system" fn collect(
            monitor: HMONITOR,
            _dc: HDC,
            _clip: *mut RECT,
            data: LPARAM,
        ) -> BOOL {
            let displays = unsafe { &mut *(data as *mut Vec<DisplayInfo>) };
            let mut info: MONITORINFOEXW = unsafe { zeroed() };
            info.monitorInfo.cbSize = size_of::<MONITORINFOEXW>() as u32;

            if unsafe { GetMonitorInfoW(monitor, (&mut info as *mut MONITORINFOEXW).cast::<MONITORINFO>()) } != 0 {
                let name_len = info.szDevice.iter().position(|&c| c == 0).unwrap_or(info.szDevice.len());
                displays.push(DisplayInfo::new(
                    rect_from_win32(&info.monitorInfo.rcMonitor),
                    from_wide(&info.szDevice[..name_len]),
                    info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                ));
            }
            TRUE
        }

        let mut displays: Vec<DisplayInfo> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                null_mut(),
                null(),
                Some(collect),
                &mut displays as *mut Vec<DisplayInfo> as LPARAM,
            )
        };
        if ok == 0 {
            return Err(last_error("EnumDisplayMonitors", Rect::default(), true));
        }

        tracing::debug!(count = displays.len(), "Enumerated monitors");
        Ok(displays)
    }

    fn system_dpi(&self) -> u32 {
        match unsafe { GetDpiForSystem() } {
            0 => 96,
            dpi => dpi,
        }
    }
}

impl DesktopBlitter for WindowsBackend {
    fn blit(&self, rect: Rect) -> CaptureResult<ImageBuffer> {
        let desktop = DesktopDc::acquire(rect)?;
        let memory = MemoryDc::compatible_with(desktop.0, rect)?;
        let dib = DibSection::new(desktop.0, rect.width, rect.height, rect)?;
        let selection = Selection::new(memory.0, dib.bitmap);

        let ok = unsafe {
            BitBlt(
                memory.0,
                0,
                0,
                rect.width as i32,
                rect.height as i32,
                desktop.0,
                rect.x,
                rect.y,
                SRCCOPY | CAPTUREBLT,
            )
        };
        if ok == 0 {
            return Err(last_error("BitBlt", rect, true));
        }
        drop(selection);

        Ok(ImageBuffer::from_rgb(dib.to_rgb()))
    }
}

impl WindowOperations for WindowsBackend {
    fn snapshot(&self, handle: WindowHandle) -> CaptureResult<WindowTarget> {
        let hwnd = hwnd(handle);
        if unsafe { IsWindow(hwnd) } == 0 {
            return Err(CaptureError::InvalidHandle { handle });
        }

        let bounds = visible_window_rect(hwnd).ok_or(CaptureError::WindowClosed)?;
        let mut pid = 0u32;
        unsafe {
            GetWindowThreadProcessId(hwnd, &mut pid);
        }
        let class_name = window_class(hwnd);

        Ok(WindowTarget {
            handle,
            bounds,
            client_bounds: client_rect(hwnd),
            minimized: unsafe { IsIconic(hwnd) } != 0,
            maximized: unsafe { IsZoomed(hwnd) } != 0,
            visible: unsafe { IsWindowVisible(hwnd) } != 0,
            process_id: pid,
            is_modern_app: MODERN_APP_CLASSES.contains(&class_name.as_str()),
            title: window_text(hwnd),
            class_name,
        })
    }

    fn restore(&self, handle: WindowHandle) -> CaptureResult<()> {
        let hwnd = hwnd(handle);
        if unsafe { IsWindow(hwnd) } == 0 {
            return Err(CaptureError::InvalidHandle { handle });
        }
        unsafe {
            ShowWindow(hwnd, SW_RESTORE);
            SetForegroundWindow(hwnd);
        }
        Ok(())
    }

    fn bring_to_foreground(&self, handle: WindowHandle) -> CaptureResult<()> {
        let hwnd = hwnd(handle);
        if unsafe { SetForegroundWindow(hwnd) } == 0 {
            return Err(CaptureError::platform(
                "SetForegroundWindow",
                Rect::default(),
                format!("window {handle} was not activated"),
                false,
            ));
        }
        Ok(())
    }

    fn foreground_window(&self) -> CaptureResult<Option<WindowHandle>> {
        let hwnd = unsafe { GetForegroundWindow() };
        Ok((!hwnd.is_null()).then(|| WindowHandle(hwnd as usize as u64)))
    }

    fn dpi_for_window(&self, handle: WindowHandle) -> CaptureResult<u32> {
        match unsafe { GetDpiForWindow(hwnd(handle)) } {
            0 => Err(CaptureError::InvalidHandle { handle }),
            dpi => Ok(dpi),
        }
    }
}

impl ProcessInspector for WindowsBackend {
    fn process_info(&self, pid: u32) -> CaptureResult<ProcessInfo> {
        let full = ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION | PROCESS_VM_READ);
        let process = match full {
            Some(process) => process,
            None => ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION).ok_or_else(|| {
                last_error("OpenProcess", Rect::default(), false)
            })?,
        };

        let path = image_path(&process);
        let name = path
            .as_deref()
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ProcessInfo {
            pid,
            name,
            product_name: path.as_deref().and_then(product_name),
            modules: loaded_modules(&process),
        })
    }

    fn minimize_working_set(&self) -> CaptureResult<()> {
        if unsafe { EmptyWorkingSet(GetCurrentProcess()) } == 0 {
            return Err(last_error("EmptyWorkingSet", Rect::default(), false));
        }
        Ok(())
    }
}

impl WindowRenderer for WindowsBackend {
    fn print_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>> {
        let hwnd = hwnd(window.handle);
        let rendered = raw_window_rect(hwnd).ok_or(CaptureError::WindowClosed)?;
        if rendered.is_empty() {
            return Ok(None);
        }

        let image = render(rendered.width, rendered.height, rendered, |dc| unsafe {
            PrintWindow(hwnd, dc, PW_RENDERFULLCONTENT) != 0
        })?;
        let Some(image) = image else {
            tracing::debug!(handle = %window.handle, "PrintWindow returned FALSE");
            return Ok(None);
        };

        Ok(crop_to_bounds(ImageBuffer::from_rgb(image.rgb), rendered, window.bounds))
    }
}

/// Shared slot the frame handler sends its single frame through
type FrameSlot = Arc<Mutex<Option<mpsc::SyncSender<CaptureResult<RgbaImage>>>>>;

/// Windows Graphics Capture session that stops after the first frame
struct OneShotCapture {
    tx: FrameSlot,
}

impl OneShotCapture {
    fn send(&self, frame: CaptureResult<RgbaImage>) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(frame);
        }
    }
}

impl GraphicsCaptureApiHandler for OneShotCapture {
    type Flags = FrameSlot;
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn new(ctx: Context<Self::Flags>) -> Result<Self, Self::Error> {
        Ok(Self { tx: ctx.flags })
    }

    fn on_frame_arrived(
        &mut self,
        frame: &mut Frame,
        capture_control: InternalCaptureControl,
    ) -> Result<(), Self::Error> {
        let width = frame.width();
        let height = frame.height();
        let mut buffer = frame.buffer()?;
        let data = buffer
            .as_raw_buffer()
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect();

        match RgbaImage::from_raw(width, height, data) {
            Some(image) => self.send(Ok(image)),
            None => self.send(Err(CaptureError::ImageError(
                "compositor frame does not match its dimensions".to_string(),
            ))),
        }
        capture_control.stop();
        Ok(())
    }

    fn on_closed(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl CompositorSource for WindowsBackend {
    fn is_enabled(&self) -> bool {
        let mut enabled: BOOL = 0;
        let hr = unsafe { DwmIsCompositionEnabled(&mut enabled) };
        hr >= 0 && enabled != 0
    }

    fn capture_window(&self, window: &WindowTarget) -> CaptureResult<Option<ImageBuffer>> {
        let hwnd = hwnd(window.handle);
        let rendered = raw_window_rect(hwnd).ok_or(CaptureError::WindowClosed)?;
        let timeout_ms = compositor_frame_timeout_ms();

        let (tx, rx) = mpsc::sync_channel::<CaptureResult<RgbaImage>>(1);
        let slot: FrameSlot = Arc::new(Mutex::new(Some(tx)));

        let settings = Settings::new(
            WcWindow::from_raw_hwnd(hwnd),
            CursorCaptureSettings::WithoutCursor,
            DrawBorderSettings::WithoutBorder,
            SecondaryWindowSettings::Default,
            MinimumUpdateIntervalSettings::Default,
            DirtyRegionSettings::Default,
            ColorFormat::Bgra8,
            slot,
        );

        let session = OneShotCapture::start_free_threaded(settings).map_err(|e| {
            CaptureError::platform("GraphicsCaptureSession", window.bounds, e.to_string(), false)
        })?;

        let frame = rx.recv_timeout(Duration::from_millis(timeout_ms));
        drop(session);

        let image = match frame {
            Ok(frame) => frame?,
            Err(_) => {
                tracing::warn!(handle = %window.handle, timeout_ms, "No compositor frame arrived");
                return Ok(None);
            }
        };

        let surface = ImageBuffer::from_rgba(image);
        if surface.dimensions() == (window.bounds.width, window.bounds.height) {
            return Ok(Some(surface));
        }
        // Frames cover the raw window rectangle, shadows and resize borders included
        let frame_rect = Rect::new(rendered.x, rendered.y, surface.width(), surface.height());
        Ok(crop_to_bounds(surface, frame_rect, window.bounds))
    }
}

impl CursorSource for WindowsBackend {
    fn current_cursor(&self) -> CaptureResult<Option<CursorSnapshot>> {
        let mut info: CURSORINFO = unsafe { zeroed() };
        info.cbSize = size_of::<CURSORINFO>() as u32;
        if unsafe { GetCursorInfo(&mut info) } == 0 {
            return Err(last_error("GetCursorInfo", Rect::default(), true));
        }

        let position = Point::new(info.ptScreenPos.x, info.ptScreenPos.y);
        if info.flags & CURSOR_SHOWING == 0 || info.hCursor.is_null() {
            return Ok(Some(CursorSnapshot {
                image:           ImageBuffer::transparent(1, 1),
                hotspot:         Point::default(),
                screen_position: position,
                showing:         false,
            }));
        }

        let mut icon: ICONINFO = unsafe { zeroed() };
        if unsafe { GetIconInfo(info.hCursor, &mut icon) } == 0 {
            return Err(last_error("GetIconInfo", Rect::default(), false));
        }
        unsafe {
            if !icon.hbmMask.is_null() {
                DeleteObject(icon.hbmMask);
            }
            if !icon.hbmColor.is_null() {
                DeleteObject(icon.hbmColor);
            }
        }

        let width = unsafe { GetSystemMetrics(SM_CXCURSOR) }.max(1) as u32;
        let height = unsafe { GetSystemMetrics(SM_CYCURSOR) }.max(1) as u32;
        let area = Rect::new(position.x, position.y, width, height);
        let drawn = render(width, height, area, |dc| unsafe {
            DrawIconEx(dc, 0, 0, info.hCursor, 0, 0, 0, null_mut(), DI_NORMAL) != 0
        })?
        .ok_or_else(|| last_error("DrawIconEx", area, false))?;

        // Monochrome cursors leave alpha at zero; treat drawn pixels as opaque
        let mut rgba = drawn.rgba;
        if rgba.pixels().all(|px| px.0[3] == 0) {
            for px in rgba.pixels_mut() {
                if px.0[..3] != [0, 0, 0] {
                    px.0[3] = 255;
                }
            }
        }

        Ok(Some(CursorSnapshot {
            image:           ImageBuffer::from_rgba(rgba),
            hotspot:         Point::new(icon.xHotspot as i32, icon.yHotspot as i32),
            screen_position: position,
            showing:         true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_backend_new() {
        assert!(WindowsBackend::new().is_ok());
    }

    #[test]
    fn test_displays_include_primary() {
        let backend = WindowsBackend::new().unwrap();
        let displays = backend.displays().unwrap();
        assert!(!displays.is_empty());
        assert!(displays.iter().any(|display| display.primary));
    }

    #[test]
    fn test_blit_returns_requested_size() {
        let backend = WindowsBackend::new().unwrap();
        let image = backend.blit(Rect::new(0, 0, 64, 32)).unwrap();
        assert_eq!(image.dimensions(), (64, 32));
    }

    #[test]
    fn test_snapshot_invalid_handle() {
        let backend = WindowsBackend::new().unwrap();
        let result = backend.snapshot(WindowHandle(0xDEAD_BEEF));
        assert!(matches!(result, Err(CaptureError::InvalidHandle { .. })));
    }

    #[test]
    fn test_current_process_info() {
        let backend = WindowsBackend::new().unwrap();
        let info = backend.process_info(std::process::id()).unwrap();
        assert!(info.name.to_lowercase().ends_with(".exe"));
        assert!(!info.modules.is_empty());
    }

    #[test]
    fn test_rect_from_win32() {
        let rect = RECT {
            left:   -10,
            top:    20,
            right:  90,
            bottom: 70,
        };
        assert_eq!(rect_from_win32(&rect), Rect::new(-10, 20, 100, 50));
    }

    #[test]
    fn test_wide_is_nul_terminated() {
        assert_eq!(wide("ab"), vec![b'a' as u16, b'b' as u16, 0]);
    }
}
