//! # Frame Buffer Rendering
//!
//! Draws the device screen with `embedded-graphics` onto any monochrome
//! [`DrawTarget`]. The geometry matches [`TouchLayout`], so a touch lands on the row or
//! tab that was drawn under it.
//!
//! ## Screen Areas
//! - **Header** (0–60 px): location and clock on a filled band, Hijri date below
//! - **List** (70 px down, 36 px rows): the active tab's rows, focused row inverted
//! - **Tab bar** (bottom 60 px): three cells, active tab filled
//!
//! [`Framebuffer`] is an in-memory target for the host build and for tests.

use crate::device::{RedrawRequest, RenderError, Renderer};
use crate::input::TouchLayout;
use crate::navigation::{SettingsField, Tab};
use crate::renderer::{format_countdown, format_date, format_time};
use core::convert::Infallible;
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PointsIter, PrimitiveStyle, Rectangle},
    text::Text,
};
use log::debug;
use std::fmt;

/// In-memory 1-bit frame buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[(y * self.width + x) as usize]
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&on| on).count()
    }

    /// Lit pixels inside `area`.
    pub fn lit_in(&self, area: Rectangle) -> usize {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0 && self.pixel(p.x as u32, p.y as u32))
            .count()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.pixels[(y * self.width + x) as usize] = color.is_on();
            }
        }
        Ok(())
    }
}

/// Renders frames onto a monochrome draw target.
pub struct FramebufferRenderer<D> {
    target: D,
    layout: TouchLayout,
}

impl<D> FramebufferRenderer<D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    pub fn new(target: D, layout: TouchLayout) -> Self {
        Self { target, layout }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn draw(&mut self, request: &RedrawRequest<'_>) -> Result<(), D::Error> {
        let layout = self.layout;
        let width = layout.width as u32;
        let large_inverse = MonoTextStyle::new(&FONT_10X20, BinaryColor::Off);
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        self.target.clear(BinaryColor::Off)?;

        // Header band
        Rectangle::new(Point::zero(), Size::new(width, 40))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut self.target)?;
        let clock = format_time(request.now, request.settings.time_format);
        Text::new(&request.settings.location.name, Point::new(6, 26), large_inverse)
            .draw(&mut self.target)?;
        Text::new(
            &clock,
            Point::new(layout.width - 6 - 10 * clock.len() as i32, 26),
            large_inverse,
        )
        .draw(&mut self.target)?;

        let subtitle = match (request.alert, request.hijri) {
            (Some(prayer), _) => format!("{} time", prayer),
            (None, Some(view)) if view.approximate => format!("~{}", view.date),
            (None, Some(view)) => view.date.to_string(),
            (None, None) => format_date(request.now, request.settings.date_format),
        };
        Text::new(&subtitle, Point::new(6, 56), small).draw(&mut self.target)?;

        for (index, text) in list_rows(request).iter().enumerate().take(layout.visible_rows()) {
            self.draw_row(index, text, index == request.state.focus)?;
        }

        self.draw_tab_bar(request.state.tab)?;

        if let Some(notice) = request.notice {
            Text::new(notice, Point::new(6, layout.tab_bar_top() - 4), small)
                .draw(&mut self.target)?;
        }
        Ok(())
    }

    fn draw_row(&mut self, index: usize, text: &str, focused: bool) -> Result<(), D::Error> {
        let layout = self.layout;
        let top = layout.row_top(index);
        let (background, foreground) = if focused {
            (BinaryColor::On, BinaryColor::Off)
        } else {
            (BinaryColor::Off, BinaryColor::On)
        };
        Rectangle::new(
            Point::new(0, top),
            Size::new(layout.width as u32, layout.row_height as u32 - 2),
        )
        .into_styled(PrimitiveStyle::with_fill(background))
        .draw(&mut self.target)?;
        Text::new(
            text,
            Point::new(8, top + layout.row_height / 2 + 5),
            MonoTextStyle::new(&FONT_10X20, foreground),
        )
        .draw(&mut self.target)?;
        Ok(())
    }

    fn draw_tab_bar(&mut self, active: Tab) -> Result<(), D::Error> {
        let layout = self.layout;
        let cell_width = layout.width / Tab::ALL.len() as i32;
        let top = layout.tab_bar_top();
        for (index, tab) in Tab::ALL.iter().enumerate() {
            let left = cell_width * index as i32;
            let cell = Rectangle::new(
                Point::new(left, top),
                Size::new(cell_width as u32, layout.tab_bar_height as u32),
            );
            let (style, text_color) = if *tab == active {
                (PrimitiveStyle::with_fill(BinaryColor::On), BinaryColor::Off)
            } else {
                (PrimitiveStyle::with_stroke(BinaryColor::On, 1), BinaryColor::On)
            };
            cell.into_styled(style).draw(&mut self.target)?;
            let label = tab.label();
            Text::new(
                label,
                Point::new(
                    left + (cell_width - 10 * label.len() as i32) / 2,
                    top + layout.tab_bar_height / 2 + 5,
                ),
                MonoTextStyle::new(&FONT_10X20, text_color),
            )
            .draw(&mut self.target)?;
        }
        Ok(())
    }
}

/// Row texts for the active tab.
fn list_rows(request: &RedrawRequest<'_>) -> Vec<String> {
    let format = request.settings.time_format;
    match request.state.tab {
        Tab::Prayer => request
            .prayers
            .map(|set| {
                set.iter()
                    .map(|(prayer, at)| {
                        let approx = if set.is_approximate(prayer) { "~" } else { "" };
                        format!("{:<8}{}{}", prayer.name(), approx, format_time(at, format))
                    })
                    .collect()
            })
            .unwrap_or_default(),
        Tab::Events => request
            .events
            .iter()
            .map(|o| {
                let approx = if o.approximate { "~" } else { "" };
                format!("{:<16}{}{}", o.event.name, approx, format_countdown(o.days_remaining))
            })
            .collect(),
        Tab::Settings => {
            let shown = request.shown_settings();
            SettingsField::ALL
                .iter()
                .map(|field| {
                    let value = field.value_label(shown);
                    if request.state.editing == Some(*field) {
                        format!("{:<9}<{}>", field.label(), value)
                    } else {
                        format!("{:<9}{}", field.label(), value)
                    }
                })
                .collect()
        }
    }
}

impl<D> Renderer for FramebufferRenderer<D>
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: fmt::Debug,
{
    fn render(&mut self, request: &RedrawRequest<'_>) -> Result<(), RenderError> {
        self.draw(request)
            .map_err(|e| RenderError::Draw(format!("{e:?}")))?;
        debug!("Frame drawn for {:?} tab", request.state.tab);
        Ok(())
    }
}
