use serde::{Deserialize, Serialize};

/// これより短いベクトルは方向を持たないものとして扱う
pub const EPSILON: f32 = 1e-6;

/// 画像座標系の2Dベクトル (x: 右が正, y: 下が正)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D外積 (z成分)
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.sub(other).length()
    }

    pub fn midpoint(self, other: Vec2) -> Vec2 {
        Vec2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// t=0 で self, t=1 で other
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2::new(
            (1.0 - t) * self.x + t * other.x,
            (1.0 - t) * self.y + t * other.y,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 点bを頂点とする角 a-b-c の内角（度, 0〜180）
///
/// 2本のレイ b→a, b→c の atan2 の差から求め、180度を超える場合は 360 - angle に折り返す。
/// ゼロ長のレイに対しては意味のある値にならないため、呼び出し側で避けること。
pub fn angle_degrees(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let radians = f32::atan2(c.y - b.y, c.x - b.x) - f32::atan2(a.y - b.y, a.x - b.x);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}

/// 2ベクトル間の無向角（ラジアン）。どちらかがほぼゼロ長なら None
pub fn angle_between(u: Vec2, v: Vec2) -> Option<f32> {
    let lu = u.length();
    let lv = v.length();
    if lu < EPSILON || lv < EPSILON {
        return None;
    }
    let cos = (u.dot(v) / (lu * lv)).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// u から v への符号付き回転角（ラジアン, -π〜π）。画像座標系では時計回りが正
pub fn signed_angle(u: Vec2, v: Vec2) -> Option<f32> {
    if u.length() < EPSILON || v.length() < EPSILON {
        return None;
    }
    Some(f32::atan2(u.cross(v), u.dot(v)))
}

/// 線分 top→bottom が画像の鉛直方向からどれだけ傾いているか（度）
pub fn tilt_from_vertical(top: Vec2, bottom: Vec2) -> Option<f32> {
    let segment = bottom.sub(top);
    angle_between(segment, Vec2::new(0.0, 1.0)).map(|r| r.to_degrees())
}

/// 0〜100 にクランプ。NaN はそのまま返すので呼び出し側で有限性を確認する
pub fn clamp_score(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}
