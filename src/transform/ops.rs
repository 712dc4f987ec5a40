// Pure grid operations backing the transform library. Every function is
// deterministic and total on well-formed grids; operations that can fail
// on degenerate input (an all-zero grid, an empty vector) return Option.

use crate::core::grid::Grid;

/// The eight rigid motions: rotations by 0/90/180/270 degrees, then
/// horizontal flip, vertical flip, transpose and anti-transpose. The
/// position offset is carried through unchanged.
pub fn rigid(g: &Grid, id: u8) -> Grid {
    match id {
        1 => {
            // 90 degrees clockwise
            let mut out = Grid::make_at(g.x, g.y, g.h, g.w, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(j, g.h - 1 - i, g.at(i, j));
                }
            }
            out
        }
        2 => {
            let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(g.h - 1 - i, g.w - 1 - j, g.at(i, j));
                }
            }
            out
        }
        3 => {
            // 270 degrees clockwise
            let mut out = Grid::make_at(g.x, g.y, g.h, g.w, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(g.w - 1 - j, i, g.at(i, j));
                }
            }
            out
        }
        4 => {
            let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(i, g.w - 1 - j, g.at(i, j));
                }
            }
            out
        }
        5 => {
            let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(g.h - 1 - i, j, g.at(i, j));
                }
            }
            out
        }
        6 => transpose(g),
        7 => {
            let mut out = Grid::make_at(g.x, g.y, g.h, g.w, 0);
            for i in 0..g.h {
                for j in 0..g.w {
                    out.set(g.w - 1 - j, g.h - 1 - i, g.at(i, j));
                }
            }
            out
        }
        _ => g.clone(),
    }
}

pub fn transpose(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.h, g.w, 0);
    for i in 0..g.h {
        for j in 0..g.w {
            out.set(j, i, g.at(i, j));
        }
    }
    out
}

pub fn flip_h(g: &Grid) -> Grid {
    rigid(g, 4)
}

pub fn flip_v(g: &Grid) -> Grid {
    rigid(g, 5)
}

/// Keep pixels of the given colour, zero the rest. Colour 0 degenerates
/// to the binary inversion, matching the search library's convention.
pub fn filter_col(g: &Grid, color: u8) -> Grid {
    if color == 0 {
        return invert(g);
    }
    let mut out = g.clone();
    for p in &mut out.pixels {
        if *p != color {
            *p = 0;
        }
    }
    out
}

/// Binary swap: zero becomes 1, everything else becomes 0.
pub fn invert(g: &Grid) -> Grid {
    let mut out = g.clone();
    for p in &mut out.pixels {
        *p = if *p == 0 { 1 } else { 0 };
    }
    out
}

/// Strip all-zero border rows and columns, shifting the offset so the
/// content keeps its absolute position. A fully zero grid compresses to a
/// 1x1 zero grid at the original offset.
pub fn compress(g: &Grid) -> Grid {
    let mut min_r = g.h;
    let mut max_r = 0usize;
    let mut min_c = g.w;
    let mut max_c = 0usize;
    let mut any = false;
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) != 0 {
                any = true;
                min_r = min_r.min(r);
                max_r = max_r.max(r);
                min_c = min_c.min(c);
                max_c = max_c.max(c);
            }
        }
    }
    if !any {
        return Grid::make_at(g.x, g.y, 1, 1, 0);
    }
    let mut out = Grid::make_at(
        g.x + min_c as i32,
        g.y + min_r as i32,
        max_c - min_c + 1,
        max_r - min_r + 1,
        0,
    );
    for r in min_r..=max_r {
        for c in min_c..=max_c {
            out.set(r - min_r, c - min_c, g.at(r, c));
        }
    }
    out
}

pub fn to_origin(g: &Grid) -> Grid {
    let mut out = g.clone();
    out.x = 0;
    out.y = 0;
    out
}

/// 4-connected non-zero components in row-major discovery order, each
/// cropped to its bounding box with the offset tracking its absolute
/// position. Adjacent pixels connect regardless of colour.
pub fn cut(g: &Grid) -> Vec<Grid> {
    let mut visited = vec![false; g.area()];
    let mut parts = Vec::new();
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) == 0 || visited[r * g.w + c] {
                continue;
            }
            let mut cells = Vec::new();
            let mut stack = vec![(r, c)];
            visited[r * g.w + c] = true;
            let (mut min_r, mut max_r, mut min_c, mut max_c) = (r, r, c, c);
            while let Some((cr, cc)) = stack.pop() {
                cells.push((cr, cc));
                min_r = min_r.min(cr);
                max_r = max_r.max(cr);
                min_c = min_c.min(cc);
                max_c = max_c.max(cc);
                for (dr, dc) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                    let nr = cr as i32 + dr;
                    let nc = cc as i32 + dc;
                    if nr >= 0
                        && nc >= 0
                        && (nr as usize) < g.h
                        && (nc as usize) < g.w
                        && g.at(nr as usize, nc as usize) != 0
                        && !visited[nr as usize * g.w + nc as usize]
                    {
                        visited[nr as usize * g.w + nc as usize] = true;
                        stack.push((nr as usize, nc as usize));
                    }
                }
            }
            let mut part = Grid::make_at(
                g.x + min_c as i32,
                g.y + min_r as i32,
                max_c - min_c + 1,
                max_r - min_r + 1,
                0,
            );
            for (cr, cc) in cells {
                part.set(cr - min_r, cc - min_c, g.at(cr, cc));
            }
            parts.push(part);
        }
    }
    parts
}

/// One full-size image per distinct non-zero colour, ascending by colour.
pub fn split_cols(g: &Grid) -> Vec<Grid> {
    let mask = g.color_mask();
    let mut parts = Vec::new();
    for color in 1..10u8 {
        if mask >> color & 1 == 0 {
            continue;
        }
        let mut part = Grid::make_at(g.x, g.y, g.w, g.h, 0);
        for (i, &p) in g.pixels.iter().enumerate() {
            if p == color {
                part.pixels[i] = color;
            }
        }
        parts.push(part);
    }
    parts
}

/// Recolour every non-zero pixel to the grid's majority non-zero colour.
pub fn color_map(g: &Grid) -> Option<Grid> {
    if g.count_nonzero() == 0 {
        return None;
    }
    let major = g.majority_col(false);
    let mut out = g.clone();
    for p in &mut out.pixels {
        if *p != 0 {
            *p = major;
        }
    }
    Some(out)
}

/// Fill zero regions that cannot reach the border with the majority
/// non-zero colour.
pub fn fill_holes(g: &Grid) -> Option<Grid> {
    if g.count_nonzero() == 0 {
        return None;
    }
    let fill = g.majority_col(false);
    let mut reachable = vec![false; g.area()];
    let mut stack = Vec::new();
    for r in 0..g.h {
        for c in 0..g.w {
            let border = r == 0 || r == g.h - 1 || c == 0 || c == g.w - 1;
            if border && g.at(r, c) == 0 && !reachable[r * g.w + c] {
                reachable[r * g.w + c] = true;
                stack.push((r, c));
            }
        }
    }
    while let Some((r, c)) = stack.pop() {
        for (dr, dc) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
            let nr = r as i32 + dr;
            let nc = c as i32 + dc;
            if nr >= 0
                && nc >= 0
                && (nr as usize) < g.h
                && (nc as usize) < g.w
                && g.at(nr as usize, nc as usize) == 0
                && !reachable[nr as usize * g.w + nc as usize]
            {
                reachable[nr as usize * g.w + nc as usize] = true;
                stack.push((nr as usize, nc as usize));
            }
        }
    }
    let mut out = g.clone();
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) == 0 && !reachable[r * g.w + c] {
                out.set(r, c, fill);
            }
        }
    }
    Some(out)
}

/// Zero out non-zero pixels with no non-zero 4-neighbour.
pub fn remove_noise(g: &Grid) -> Grid {
    let mut out = g.clone();
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) == 0 {
                continue;
            }
            let isolated = [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)]
                .iter()
                .all(|&(dr, dc)| g.safe(r as i32 + dr, c as i32 + dc) == 0);
            if isolated {
                out.set(r, c, 0);
            }
        }
    }
    out
}

/// Keep only the largest 4-connected component, cropped to its bounding
/// box. Ties resolve to the component discovered first.
pub fn extract_pattern(g: &Grid) -> Option<Grid> {
    let parts = cut(g);
    parts.into_iter().max_by_key(|p| p.count_nonzero())
}

/// Pixel-double the image.
pub fn replicate(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w * 2, g.h * 2, 0);
    for r in 0..g.h {
        for c in 0..g.w {
            let v = g.at(r, c);
            out.set(r * 2, c * 2, v);
            out.set(r * 2, c * 2 + 1, v);
            out.set(r * 2 + 1, c * 2, v);
            out.set(r * 2 + 1, c * 2 + 1, v);
        }
    }
    out
}

/// Let non-zero pixels fall to the bottom of their column, preserving
/// column order.
pub fn gravity_down(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
    for c in 0..g.w {
        let column: Vec<u8> = (0..g.h).map(|r| g.at(r, c)).filter(|&p| p != 0).collect();
        let offset = g.h - column.len();
        for (i, &p) in column.iter().enumerate() {
            out.set(offset + i, c, p);
        }
    }
    out
}

/// The four gravity directions; up/left/right are flip and transpose
/// conjugates of the downward fall.
pub fn gravity(g: &Grid, dir: u8) -> Grid {
    match dir {
        1 => flip_v(&gravity_down(&flip_v(g))),
        2 => transpose(&flip_v(&gravity_down(&flip_v(&transpose(g))))),
        3 => transpose(&gravity_down(&transpose(g))),
        _ => gravity_down(g),
    }
}

/// Recolour every non-zero pixel to the given colour.
pub fn col_shape(g: &Grid, color: u8) -> Grid {
    let mut out = g.clone();
    for p in &mut out.pixels {
        if *p != 0 {
            *p = color;
        }
    }
    out
}

/// Append a horizontally mirrored copy to the right.
pub fn mirror_h(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w * 2, g.h, 0);
    for r in 0..g.h {
        for c in 0..g.w {
            let v = g.at(r, c);
            out.set(r, c, v);
            out.set(r, 2 * g.w - 1 - c, v);
        }
    }
    out
}

/// Append a vertically mirrored copy below.
pub fn mirror_v(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w, g.h * 2, 0);
    for r in 0..g.h {
        for c in 0..g.w {
            let v = g.at(r, c);
            out.set(r, c, v);
            out.set(2 * g.h - 1 - r, c, v);
        }
    }
    out
}

fn on_boundary(g: &Grid, r: usize, c: usize) -> bool {
    [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)]
        .iter()
        .any(|&(dr, dc)| g.safe(r as i32 + dr, c as i32 + dc) == 0)
}

/// Keep only the pixels on the boundary of their component.
pub fn border(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) != 0 && on_boundary(g, r, c) {
                out.set(r, c, g.at(r, c));
            }
        }
    }
    out
}

/// Keep only the pixels strictly inside their component.
pub fn interior(g: &Grid) -> Grid {
    let mut out = Grid::make_at(g.x, g.y, g.w, g.h, 0);
    for r in 0..g.h {
        for c in 0..g.w {
            if g.at(r, c) != 0 && !on_boundary(g, r, c) {
                out.set(r, c, g.at(r, c));
            }
        }
    }
    out
}

/// A 1x1 marker at the grid's position, carrying the majority non-zero
/// colour. Lets position information survive a compress.
pub fn get_pos(g: &Grid) -> Option<Grid> {
    if g.count_nonzero() == 0 {
        return None;
    }
    Some(Grid::make_at(g.x, g.y, 1, 1, g.majority_col(false)))
}

/// The grid's bounding frame filled with its majority non-zero colour.
pub fn hull(g: &Grid) -> Option<Grid> {
    if g.count_nonzero() == 0 {
        return None;
    }
    Some(Grid::make_at(g.x, g.y, g.w, g.h, g.majority_col(false)))
}

/// From a vector of images, the one with the most non-zero pixels.
pub fn pick_largest(images: &[Grid]) -> Option<Grid> {
    let mut best: Option<&Grid> = None;
    for img in images {
        match best {
            Some(b) if img.count_nonzero() <= b.count_nonzero() => {}
            _ => best = Some(img),
        }
    }
    best.cloned()
}

/// Overlay a vector of images onto their common hull in order; later
/// non-zero pixels win. The hull spans the images' absolute positions.
pub fn stack_compose(images: &[Grid]) -> Option<Grid> {
    let min_x = images.iter().map(|g| g.x).min()?;
    let min_y = images.iter().map(|g| g.y).min()?;
    let max_x = images.iter().map(|g| g.x + g.w as i32).max()?;
    let max_y = images.iter().map(|g| g.y + g.h as i32).max()?;
    let w = (max_x - min_x) as usize;
    let h = (max_y - min_y) as usize;
    let mut out = Grid::make_at(min_x, min_y, w, h, 0);
    for img in images {
        let off_r = (img.y - min_y) as usize;
        let off_c = (img.x - min_x) as usize;
        for r in 0..img.h {
            for c in 0..img.w {
                let v = img.at(r, c);
                if v != 0 {
                    out.set(off_r + r, off_c + c, v);
                }
            }
        }
    }
    Some(out)
}
