use sable_core::value::{Color, Number, Value};

use super::{Args, FnError, FnResult, check_range};

fn color(color: Color) -> FnResult {
    Ok(Value::Color(color))
}

/// A channel given either as `0..=255` or as a percentage.
fn rgb_channel(number: &Number) -> Result<f64, FnError> {
    if number.has_unit("%") {
        let value = number.value();
        if (0.0..=100.0).contains(&value) {
            return Ok(value * 255.0 / 100.0);
        }
        return Err(FnError::Argument(format!(
            "Color value {} must be between 0% and 100% inclusive",
            number.inspect()
        )));
    }
    let value = number.value();
    if (0.0..=255.0).contains(&value) {
        Ok(value)
    } else {
        Err(FnError::Argument(format!(
            "Color value {} must be between 0 and 255 inclusive",
            number.inspect()
        )))
    }
}

fn alpha_channel(number: &Number) -> Result<f64, FnError> {
    let value = number.value();
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(FnError::Argument(format!(
            "Alpha channel {} must be between 0 and 1 inclusive",
            number.inspect()
        )))
    }
}

pub(super) fn rgb(args: &mut Args) -> FnResult {
    let red = rgb_channel(args.number(0)?)?;
    let green = rgb_channel(args.number(1)?)?;
    let blue = rgb_channel(args.number(2)?)?;
    color(Color::from_rgba(red, green, blue, 1.0))
}

/// `rgba($color, $alpha)` or `rgba($red, $green, $blue, $alpha)`.
pub(super) fn rgba(args: &mut Args) -> FnResult {
    match args.len() {
        2 => {
            let base = args.color(0)?;
            let alpha = alpha_channel(args.number(1)?)?;
            color(base.with_alpha(alpha))
        }
        4 => {
            let red = rgb_channel(args.number(0)?)?;
            let green = rgb_channel(args.number(1)?)?;
            let blue = rgb_channel(args.number(2)?)?;
            let alpha = alpha_channel(args.number(3)?)?;
            color(Color::from_rgba(red, green, blue, alpha))
        }
        n => Err(FnError::Argument(format!(
            "wrong number of arguments ({n} for 2 or 4)"
        ))),
    }
}

fn hsla_color(args: &Args, alpha: f64) -> Result<Color, FnError> {
    let hue = args.number(0)?.value();
    let saturation = check_range("Saturation", args.number(1)?, 0.0..=100.0, "%")?;
    let lightness = check_range("Lightness", args.number(2)?, 0.0..=100.0, "%")?;
    Ok(Color::from_hsla(hue, saturation, lightness, alpha))
}

pub(super) fn hsl(args: &mut Args) -> FnResult {
    color(hsla_color(args, 1.0)?)
}

pub(super) fn hsla(args: &mut Args) -> FnResult {
    let alpha = alpha_channel(args.number(3)?)?;
    color(hsla_color(args, alpha)?)
}

pub(super) fn red(args: &mut Args) -> FnResult {
    Ok(Value::number(args.color(0)?.red()))
}

pub(super) fn green(args: &mut Args) -> FnResult {
    Ok(Value::number(args.color(0)?.green()))
}

pub(super) fn blue(args: &mut Args) -> FnResult {
    Ok(Value::number(args.color(0)?.blue()))
}

pub(super) fn hue(args: &mut Args) -> FnResult {
    Ok(Value::Number(Number::with_unit(args.color(0)?.hue(), "deg")))
}

pub(super) fn saturation(args: &mut Args) -> FnResult {
    Ok(Value::Number(Number::with_unit(
        args.color(0)?.saturation(),
        "%",
    )))
}

pub(super) fn lightness(args: &mut Args) -> FnResult {
    Ok(Value::Number(Number::with_unit(
        args.color(0)?.lightness(),
        "%",
    )))
}

/// `alpha()` also accepts the IE filter syntax `alpha(opacity=50)`, which
/// is passed through unchanged.
pub(super) fn alpha(args: &mut Args) -> FnResult {
    if let Value::Str(text) = args.value(0)? {
        if !text.is_quoted() && text.text().starts_with("opacity=") {
            return Ok(Value::unquoted(format!("alpha({})", text.text())));
        }
    }
    Ok(Value::number(args.color(0)?.alpha()))
}

#[derive(Clone, Copy)]
enum Channel {
    Hue,
    Saturation,
    Lightness,
    Alpha,
}

/// Shift one channel by `amount`, after checking the amount against the
/// channel's range. The result is clamped into range.
fn adjust(args: &Args, channel: Channel, sign: f64) -> FnResult {
    let base = args.color(0)?;
    let amount = args.number(1)?;
    let [h, s, l] = base.hsl();
    let adjusted = match channel {
        Channel::Hue => base.with_hsl(h + sign * amount.value(), s, l),
        Channel::Saturation => {
            let by = check_range("Amount", amount, 0.0..=100.0, "%")?;
            base.with_hsl(h, (s + sign * by).clamp(0.0, 100.0), l)
        }
        Channel::Lightness => {
            let by = check_range("Amount", amount, 0.0..=100.0, "%")?;
            base.with_hsl(h, s, (l + sign * by).clamp(0.0, 100.0))
        }
        Channel::Alpha => {
            let by = check_range("Amount", amount, 0.0..=1.0, "")?;
            base.with_alpha((base.alpha() + sign * by).clamp(0.0, 1.0))
        }
    };
    color(adjusted)
}

pub(super) fn opacify(args: &mut Args) -> FnResult {
    adjust(args, Channel::Alpha, 1.0)
}

pub(super) fn transparentize(args: &mut Args) -> FnResult {
    adjust(args, Channel::Alpha, -1.0)
}

pub(super) fn lighten(args: &mut Args) -> FnResult {
    adjust(args, Channel::Lightness, 1.0)
}

pub(super) fn darken(args: &mut Args) -> FnResult {
    adjust(args, Channel::Lightness, -1.0)
}

pub(super) fn saturate(args: &mut Args) -> FnResult {
    adjust(args, Channel::Saturation, 1.0)
}

pub(super) fn desaturate(args: &mut Args) -> FnResult {
    adjust(args, Channel::Saturation, -1.0)
}

pub(super) fn adjust_hue(args: &mut Args) -> FnResult {
    adjust(args, Channel::Hue, 1.0)
}

/// Channels addressable by keyword in `adjust-color`, `scale-color` and
/// `change-color`, with their maximum value and unit.
const CHANNELS: [(&str, Option<f64>, &str); 7] = [
    ("red", Some(255.0), ""),
    ("green", Some(255.0), ""),
    ("blue", Some(255.0), ""),
    ("hue", None, ""),
    ("saturation", Some(100.0), "%"),
    ("lightness", Some(100.0), "%"),
    ("alpha", Some(1.0), ""),
];

fn channel_value(color: &Color, name: &str) -> f64 {
    match name {
        "red" => color.red(),
        "green" => color.green(),
        "blue" => color.blue(),
        "hue" => color.hue(),
        "saturation" => color.saturation(),
        "lightness" => color.lightness(),
        _ => color.alpha(),
    }
}

/// Pull the channel keywords out of `args`, mapping each through `compute`
/// (given the channel's current value, maximum and unit), then build the
/// new color.
fn with_channels(
    args: &mut Args,
    compute: impl Fn(&str, &Number, f64, Option<f64>, &str) -> Result<f64, FnError>,
) -> FnResult {
    let base = args.color(0)?.clone();
    let mut changes: Vec<(&str, f64)> = Vec::new();
    for (name, max, unit) in CHANNELS {
        let Some(value) = args.take_keyword(name) else {
            continue;
        };
        let Value::Number(number) = &value else {
            return Err(FnError::Argument(format!(
                "${name}: {} is not a number",
                value.inspect()
            )));
        };
        let current = channel_value(&base, name);
        changes.push((name, compute(name, number, current, max, unit)?));
    }
    if let Some((name, value)) = args.first_keyword() {
        return Err(FnError::Argument(format!(
            "Unknown argument ${name} ({})",
            value.inspect()
        )));
    }

    let touches = |names: &[&str]| changes.iter().any(|(n, _)| names.contains(n));
    let rgb = touches(&["red", "green", "blue"]);
    let hsl = touches(&["hue", "saturation", "lightness"]);
    if rgb && hsl {
        return Err(FnError::Argument(
            "Cannot specify HSL and RGB values for a color at the same time".to_string(),
        ));
    }
    let get = |name: &str| {
        changes
            .iter()
            .find(|(n, _)| *n == name)
            .map_or_else(|| channel_value(&base, name), |(_, v)| *v)
    };
    let alpha = get("alpha");
    let result = if rgb {
        Color::from_rgba(get("red"), get("green"), get("blue"), alpha)
    } else if hsl {
        Color::from_hsla(get("hue"), get("saturation"), get("lightness"), alpha)
    } else {
        base.with_alpha(alpha)
    };
    color(result)
}

fn range_error(name: &str, number: &Number, low: f64, high: f64, unit: &str) -> FnError {
    let bound = sable_core::value::format_number;
    FnError::Argument(format!(
        "${name}: Amount {} must be between {}{unit} and {}{unit}",
        number.inspect(),
        bound(low),
        bound(high)
    ))
}

pub(super) fn adjust_color(args: &mut Args) -> FnResult {
    with_channels(args, |name, number, current, max, unit| {
        let by = number.value();
        match max {
            None => Ok(current + by),
            Some(max) if (-max..=max).contains(&by) => Ok((current + by).clamp(0.0, max)),
            Some(max) => Err(range_error(name, number, -max, max, unit)),
        }
    })
}

pub(super) fn scale_color(args: &mut Args) -> FnResult {
    if let Some(hue) = args.take_keyword("hue") {
        return Err(FnError::Argument(format!(
            "Unknown argument $hue ({})",
            hue.inspect()
        )));
    }
    with_channels(args, |name, number, current, max, _| {
        if !number.has_unit("%") {
            return Err(FnError::Argument(format!(
                "${name}: Amount {} must be a % (e.g. {}%)",
                number.inspect(),
                sable_core::value::format_number(number.value())
            )));
        }
        let scale = number.value();
        if !(-100.0..=100.0).contains(&scale) {
            return Err(range_error(name, number, -100.0, 100.0, "%"));
        }
        let max = max.unwrap_or(360.0);
        let scale = scale / 100.0;
        let diff = if scale > 0.0 { max - current } else { current };
        Ok(current + diff * scale)
    })
}

pub(super) fn change_color(args: &mut Args) -> FnResult {
    with_channels(args, |name, number, _, max, unit| {
        let value = number.value();
        match max {
            Some(max) if !(0.0..=max).contains(&value) => {
                Err(range_error(name, number, 0.0, max, unit))
            }
            _ => Ok(value),
        }
    })
}

/// Weighted average of two colors; the weight favours the first color and
/// also accounts for the difference in opacity.
pub(super) fn mix(args: &mut Args) -> FnResult {
    let first = args.color(0)?;
    let second = args.color(1)?;
    let weight = args.number_or(2, Number::with_unit(50.0, "%"))?;
    let p = check_range("Weight", &weight, 0.0..=100.0, "%")? / 100.0;

    let w = p * 2.0 - 1.0;
    let a = first.alpha() - second.alpha();
    let w1 = (if w * a == -1.0 { w } else { (w + a) / (1.0 + w * a) } + 1.0) / 2.0;
    let w2 = 1.0 - w1;

    let [r1, g1, b1] = first.rgb();
    let [r2, g2, b2] = second.rgb();
    let alpha = first.alpha() * p + second.alpha() * (1.0 - p);
    color(Color::from_rgba(
        r1 * w1 + r2 * w2,
        g1 * w1 + g2 * w2,
        b1 * w1 + b2 * w2,
        alpha,
    ))
}

pub(super) fn grayscale(args: &mut Args) -> FnResult {
    let base = args.color(0)?;
    let [h, _, l] = base.hsl();
    color(base.with_hsl(h, 0.0, l))
}

pub(super) fn complement(args: &mut Args) -> FnResult {
    let base = args.color(0)?;
    let [h, s, l] = base.hsl();
    color(base.with_hsl(h + 180.0, s, l))
}

pub(super) fn invert(args: &mut Args) -> FnResult {
    let base = args.color(0)?;
    let [r, g, b] = base.rgb();
    color(base.with_rgb(255.0 - r, 255.0 - g, 255.0 - b))
}

#[cfg(test)]
mod tests {
    use sable_core::style::OutputStyle;

    use crate::functions::lookup;

    use super::*;

    fn hex(text: &str) -> Value {
        Value::Color(Color::from_hex(text).expect("valid hex"))
    }

    fn pct(value: f64) -> Value {
        Value::Number(Number::with_unit(value, "%"))
    }

    fn call(name: &str, positional: Vec<Value>) -> String {
        call_with(name, positional, Vec::new())
    }

    fn call_with(name: &str, positional: Vec<Value>, keywords: Vec<(&str, Value)>) -> String {
        let keywords = keywords
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        lookup(name)
            .expect("known function")
            .invoke(positional, keywords)
            .expect("call succeeds")
            .to_css(OutputStyle::Nested)
            .expect("valid css")
    }

    fn call_err(name: &str, positional: Vec<Value>) -> String {
        lookup(name)
            .expect("known function")
            .invoke(positional, Vec::new())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_rgb_accepts_percentages() {
        assert_eq!(call("rgb", vec![pct(100.0), pct(0.0), pct(0.0)]), "red");
        assert_eq!(
            call_err("rgb", vec![Value::number(256.0), Value::number(0.0), Value::number(0.0)]),
            "Color value 256 must be between 0 and 255 inclusive"
        );
    }

    #[test]
    fn test_rgba_forms() {
        assert_eq!(
            call("rgba", vec![hex("#102030"), Value::number(0.5)]),
            "rgba(16, 32, 48, 0.5)"
        );
        assert_eq!(
            call(
                "rgba",
                vec![
                    Value::number(1.0),
                    Value::number(2.0),
                    Value::number(3.0),
                    Value::number(0.25)
                ]
            ),
            "rgba(1, 2, 3, 0.25)"
        );
    }

    #[test]
    fn test_hsl() {
        assert_eq!(
            call("hsl", vec![Value::number(0.0), pct(100.0), pct(50.0)]),
            "red"
        );
        assert_eq!(
            call_err("hsl", vec![Value::number(0.0), pct(120.0), pct(50.0)]),
            "Saturation 120% must be between 0% and 100%"
        );
    }

    #[test]
    fn test_lighten_and_darken() {
        assert_eq!(call("lighten", vec![hex("#800"), pct(20.0)]), "#ee0000");
        assert_eq!(call("darken", vec![hex("#800"), pct(100.0)]), "black");
        assert_eq!(
            call_err("lighten", vec![hex("#800"), pct(120.0)]),
            "Amount 120% must be between 0% and 100%"
        );
    }

    #[test]
    fn test_alpha_adjustments() {
        let half = Value::Color(Color::from_rgba(0.0, 0.0, 0.0, 0.5));
        assert_eq!(
            call("opacify", vec![half.clone(), Value::number(0.2)]),
            "rgba(0, 0, 0, 0.7)"
        );
        assert_eq!(
            call("fade-out", vec![half, Value::number(0.75)]),
            "rgba(0, 0, 0, 0)"
        );
    }

    #[test]
    fn test_alpha_filter_passthrough() {
        assert_eq!(
            call("alpha", vec![Value::unquoted("opacity=50")]),
            "alpha(opacity=50)"
        );
    }

    #[test]
    fn test_mix() {
        assert_eq!(call("mix", vec![hex("#f00"), hex("#00f")]), "#7f007f");
        assert_eq!(
            call("mix", vec![hex("#f00"), hex("#00f"), pct(25.0)]),
            "#3f00bf"
        );
    }

    #[test]
    fn test_complement_and_invert() {
        assert_eq!(call("complement", vec![hex("#f00")]), "aqua");
        assert_eq!(call("invert", vec![hex("#000")]), "white");
        assert_eq!(call("grayscale", vec![hex("#f00")]), "gray");
    }

    #[test]
    fn test_adjust_color_keywords() {
        assert_eq!(
            call_with(
                "adjust-color",
                vec![hex("#102030")],
                vec![("blue", Value::number(5.0))]
            ),
            "#102035"
        );
        let err = lookup("adjust-color")
            .expect("known")
            .invoke(
                vec![hex("#102030")],
                vec![
                    ("red".to_string(), Value::number(1.0)),
                    ("hue".to_string(), Value::number(1.0)),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot specify HSL and RGB values for a color at the same time"
        );
    }

    #[test]
    fn test_scale_and_change_color() {
        assert_eq!(
            call_with(
                "scale-color",
                vec![hex("#000")],
                vec![("lightness", pct(100.0))]
            ),
            "white"
        );
        assert_eq!(
            call_with(
                "change-color",
                vec![hex("#102030")],
                vec![("alpha", Value::number(0.5))]
            ),
            "rgba(16, 32, 48, 0.5)"
        );
        let err = lookup("scale-color")
            .expect("known")
            .invoke(vec![hex("#000")], vec![("red".to_string(), Value::number(10.0))])
            .unwrap_err();
        assert_eq!(err.to_string(), "$red: Amount 10 must be a % (e.g. 10%)");
    }
}
