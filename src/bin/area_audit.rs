use std::path::Path;
use tibia_combat::combat::ability::{find, load_catalogue};
use tibia_combat::world::area::AreaShape;
use tibia_combat::world::position::{Direction, CARDINAL_DIRECTIONS, DIAGONAL_DIRECTIONS};

fn render(shape: &AreaShape) -> Vec<String> {
    let origin = shape.origin();
    (0..shape.rows())
        .map(|row| {
            (0..shape.cols())
                .map(|col| match ((row, col) == origin, shape.get(row, col)) {
                    (true, true) => '@',
                    (true, false) => 'o',
                    (false, true) => '#',
                    (false, false) => '.',
                })
                .collect()
        })
        .collect()
}

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err("usage: area_audit <abilities.yaml> <ability name>".to_string());
    }
    let abilities = load_catalogue(Path::new(&args[1])).map_err(|err| err.to_string())?;
    let name = args[2..].join(" ");
    let ability = find(&abilities, &name).ok_or_else(|| format!("unknown ability '{}'", name))?;
    let Some(area) = ability.area.as_ref() else {
        println!("{}: single target", ability.name);
        return Ok(());
    };

    println!("area audit: {}", ability.name);
    let directions: Vec<Direction> = if area.has_extended() {
        CARDINAL_DIRECTIONS.into_iter().chain(DIAGONAL_DIRECTIONS).collect()
    } else {
        CARDINAL_DIRECTIONS.to_vec()
    };
    for direction in directions {
        let shape = area.shape(direction);
        println!(
            "- {:?}: {}x{}, {} tiles",
            direction,
            shape.rows(),
            shape.cols(),
            shape.cell_count()
        );
        for line in render(shape) {
            println!("    {}", line);
        }
    }
    Ok(())
}
